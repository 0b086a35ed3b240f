mod support;

use std::cell::RefCell;
use std::rc::Rc;

use dispatch_core::bidding::{
    BidAuxiliary, BidPolicy, BidState, BiddingStrategyKind, Experience, PolicyHandle,
};
use dispatch_core::coordinator::DispatchCoordinator;
use dispatch_core::test_helpers::{unit_square, unit_square_scenario_config};
use support::{assert_close, p, request};

/// Always returns the same action and remembers what it was trained on.
#[derive(Default)]
struct RecordingPolicy {
    action: f64,
    seen_states: Vec<BidState>,
    trained: Vec<Experience>,
    training_passes: usize,
}

impl BidPolicy for RecordingPolicy {
    fn act(&mut self, state: &BidState) -> (f64, BidAuxiliary) {
        self.seen_states.push(*state);
        (self.action, BidAuxiliary(vec![self.action, -1.0]))
    }

    fn train(&mut self, experiences: &[Experience]) {
        self.training_passes += 1;
        self.trained.extend_from_slice(experiences);
    }
}

fn learned_coordinator(policies: &[Rc<RefCell<RecordingPolicy>>]) -> DispatchCoordinator {
    let config = unit_square_scenario_config().with_bidding_strategy(BiddingStrategyKind::Learned);
    let mut coordinator = DispatchCoordinator::new(unit_square(), config).expect("coordinator");
    for policy in policies {
        let handle: PolicyHandle = policy.clone();
        coordinator
            .add_vehicle(p(0.0, 0.0), &[], Some(handle))
            .expect("vehicle");
    }
    coordinator
}

#[test]
fn experiences_carry_state_bid_auxiliary_and_payoff() {
    let policy = Rc::new(RefCell::new(RecordingPolicy {
        action: 0.0,
        ..Default::default()
    }));
    let mut coordinator = learned_coordinator(&[policy.clone()]);
    coordinator
        .allocate(&[request((0.0, 0.0), (1.0, 0.0), 0.0)])
        .expect("allocate");

    assert_eq!(policy.borrow().seen_states.len(), 1);
    assert_eq!(coordinator.vehicles()[0].pending_experiences(), 1);

    let consumed = coordinator.train();
    assert_eq!(consumed, 1);
    let policy = policy.borrow();
    assert_eq!(policy.training_passes, 1);
    let experience = &policy.trained[0];
    assert_eq!(experience.state.start, p(0.0, 0.0));
    assert_eq!(experience.state.dropoff, p(1.0, 0.0));
    assert_eq!(experience.bid, 0.0);
    assert_eq!(experience.auxiliary, BidAuxiliary(vec![0.0, -1.0]));
    assert!(!experience.terminal);
    // adjusted bid equals the value, so cost-minus-bid pays nothing
    assert_close(experience.reward, 16.8, "reward");
    assert_close(coordinator.payoff(), 0.0, "coordinator payoff");
}

#[test]
fn training_without_new_experience_is_skipped() {
    let policy = Rc::new(RefCell::new(RecordingPolicy::default()));
    let mut coordinator = learned_coordinator(&[policy.clone()]);
    assert_eq!(coordinator.train(), 0);
    assert_eq!(policy.borrow().training_passes, 0);
}

#[test]
fn learned_actions_rank_as_value_relative_adjustments() {
    let cheap = Rc::new(RefCell::new(RecordingPolicy {
        action: -0.5,
        ..Default::default()
    }));
    let pricey = Rc::new(RefCell::new(RecordingPolicy {
        action: 0.5,
        ..Default::default()
    }));
    let mut coordinator = learned_coordinator(&[pricey.clone(), cheap.clone()]);
    coordinator
        .allocate(&[request((0.0, 0.0), (1.0, 0.0), 0.0)])
        .expect("allocate");

    // 16.8 * 0.75 beats 16.8 * 1.25 under a minimizing rule
    assert!(coordinator.vehicles()[0].plans().is_empty());
    assert_eq!(coordinator.vehicles()[1].plans().len(), 1);
    assert_close(coordinator.payoff(), 16.8 - 16.8 * 0.75, "payment");
}

#[test]
fn nan_action_never_wins_a_minimizing_auction() {
    let broken = Rc::new(RefCell::new(RecordingPolicy {
        action: f64::NAN,
        ..Default::default()
    }));
    let sane = Rc::new(RefCell::new(RecordingPolicy {
        action: 1.0,
        ..Default::default()
    }));
    let mut coordinator = learned_coordinator(&[broken, sane]);
    coordinator
        .allocate(&[request((0.0, 0.0), (1.0, 0.0), 0.0)])
        .expect("allocate");
    assert!(coordinator.vehicles()[0].plans().is_empty());
    assert_eq!(coordinator.vehicles()[1].plans().len(), 1);
}
