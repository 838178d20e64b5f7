/*
    Metrics - decision counters for monitoring

    Counters cover admission results, denial reasons, placement outcomes,
    and ban-list self-healing writes. Exported through the `metrics` facade;
    wiring an exporter is the embedding application's concern.
*/

use metrics::{counter, describe_counter};

/// Register metric descriptions (call once at startup)
pub fn init_metrics() {
    describe_counter!(
        "regionwarden_admissions_total",
        "Total admission decisions, labeled by result (allowed, denied)"
    );

    describe_counter!(
        "regionwarden_admission_denials_total",
        "Total admission denials, labeled by reason"
    );

    describe_counter!(
        "regionwarden_placements_total",
        "Total placement computations, labeled by result (allowed, denied)"
    );

    describe_counter!(
        "regionwarden_ban_list_rewrites_total",
        "Total self-healing ban-list writes, labeled by kind (heal, propagate)"
    );
}

pub fn admission(result: &'static str) {
    counter!("regionwarden_admissions_total", "result" => result).increment(1);
}

pub fn admission_denial(reason: &'static str) {
    counter!("regionwarden_admission_denials_total", "reason" => reason).increment(1);
}

pub fn placement(result: &'static str) {
    counter!("regionwarden_placements_total", "result" => result).increment(1);
}

pub fn ban_list_rewrite(kind: &'static str) {
    counter!("regionwarden_ban_list_rewrites_total", "kind" => kind).increment(1);
}
