use orchestry_types::NodeState;

/// The events the election state machine responds to (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Tick,
    HeartbeatTimeout,
    LeaseAcquired,
    LeaseLost,
    Shutdown,
}

/// Pure transition function, kept separate from the async loop so the state
/// machine itself is unit-testable without a store.
pub fn transition(current: NodeState, event: Event) -> NodeState {
    use Event::*;
    use NodeState::*;

    match (current, event) {
        (_, Shutdown) => Stopped,
        (Follower, HeartbeatTimeout) => Candidate,
        (Candidate, LeaseAcquired) => Leader,
        (Candidate, LeaseLost) => Follower,
        (Leader, LeaseLost) => Follower,
        // Any other (state, event) pair is either a no-op tick or an event
        // that doesn't apply to the current state; stay put.
        (state, _) => state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestry_types::NodeState::*;

    #[test]
    fn follower_becomes_candidate_on_heartbeat_timeout() {
        assert_eq!(transition(Follower, Event::HeartbeatTimeout), Candidate);
    }

    #[test]
    fn candidate_becomes_leader_on_lease_acquired() {
        assert_eq!(transition(Candidate, Event::LeaseAcquired), Leader);
    }

    #[test]
    fn candidate_falls_back_to_follower_on_lease_lost() {
        assert_eq!(transition(Candidate, Event::LeaseLost), Follower);
    }

    #[test]
    fn leader_demotes_to_follower_on_failed_renewal() {
        assert_eq!(transition(Leader, Event::LeaseLost), Follower);
    }

    #[test]
    fn shutdown_always_terminates() {
        for state in [Follower, Candidate, Leader, Stopped] {
            assert_eq!(transition(state, Event::Shutdown), Stopped);
        }
    }

    #[test]
    fn tick_is_a_no_op_in_every_state() {
        for state in [Follower, Candidate, Leader, Stopped] {
            assert_eq!(transition(state, Event::Tick), state);
        }
    }

    #[test]
    fn stopped_is_terminal() {
        for event in [Event::Tick, Event::HeartbeatTimeout, Event::LeaseAcquired, Event::LeaseLost] {
            assert_eq!(transition(Stopped, event), Stopped);
        }
    }
}
