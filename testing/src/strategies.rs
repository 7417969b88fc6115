//! `proptest` generators for the 6-D state space and action vocabulary,
//! shared by the determinism/monotonicity property tests that live next
//! to the code they cover and by `pw-cross-tests`' end-to-end scenarios.

use pw_core::{Action, ClusterId, Engagement, PhaseClass, QuarterBin, State};
use proptest::prelude::*;

pub fn arb_quarter_bin() -> impl Strategy<Value = QuarterBin> {
    prop_oneof![
        Just(QuarterBin::Q25),
        Just(QuarterBin::Q50),
        Just(QuarterBin::Q75),
        Just(QuarterBin::Q100),
    ]
}

pub fn arb_phase_class() -> impl Strategy<Value = PhaseClass> {
    prop_oneof![Just(PhaseClass::Pre), Just(PhaseClass::Active), Just(PhaseClass::Reflective)]
}

pub fn arb_engagement() -> impl Strategy<Value = Engagement> {
    prop_oneof![Just(Engagement::Low), Just(Engagement::Medium), Just(Engagement::High)]
}

/// Every member of the closed action vocabulary, `Advance` included.
pub fn arb_action() -> impl Strategy<Value = Action> {
    (0..Action::all().len()).prop_map(|i| Action::all()[i])
}

pub fn arb_cluster_id() -> impl Strategy<Value = ClusterId> {
    (0i64..16).prop_map(ClusterId::new)
}

prop_compose! {
    /// A state drawn from a small, bounded space — wide enough to exercise
    /// every bin and tie-break case, small enough that property tests
    /// converge quickly.
    pub fn arb_state()(
        cluster_id in arb_cluster_id(),
        module_idx in 0u32..8,
        progress_bin in arb_quarter_bin(),
        score_bin in arb_quarter_bin(),
        phase in arb_phase_class(),
        engagement in arb_engagement(),
    ) -> State {
        State { cluster_id, module_idx, progress_bin, score_bin, phase, engagement }
    }
}
