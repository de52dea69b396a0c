//! Translation of platform state codes into [`CanonicalState`].

use domain_billing::model::vo::{CanonicalState, LcmState, StateCode, VmState};
use num_traits::FromPrimitive;

type Resolver = fn(&StateCode) -> Option<CanonicalState>;

/// Tried in order, the first answer wins.
const RESOLVERS: [Resolver; 3] = [by_state, by_lcm_state, by_lcm_state_name];

/// Mapped when no resolver knows the code: the VM is mid transition and billed as active.
const FALLBACK: CanonicalState = CanonicalState::Operation;

pub fn map_state(state: i32, lcm_state: i32, lcm_state_name: &str) -> CanonicalState {
    map_code(&StateCode::new(state, lcm_state, lcm_state_name))
}

pub fn map_code(code: &StateCode) -> CanonicalState {
    RESOLVERS.iter().find_map(|resolve| resolve(code)).unwrap_or(FALLBACK)
}

fn by_state(code: &StateCode) -> Option<CanonicalState> {
    use VmState::*;
    Some(match VmState::from_i32(code.state)? {
        Init | Pending | Hold | Undeployed => CanonicalState::Init,
        Stopped | Poweroff => CanonicalState::Stopped,
        Suspended => CanonicalState::Suspended,
        Done => CanonicalState::Deleted,
        Cloning => CanonicalState::Operation,
        CloningFailure => CanonicalState::Failure,
        Active | Failed => return None,
    })
}

fn by_lcm_state(code: &StateCode) -> Option<CanonicalState> {
    match LcmState::from_i32(code.lcm_state)? {
        LcmState::LcmInit => Some(CanonicalState::Init),
        LcmState::Running => Some(CanonicalState::Running),
        _ => None,
    }
}

fn by_lcm_state_name(code: &StateCode) -> Option<CanonicalState> {
    let name = code.lcm_state_name.trim().to_ascii_uppercase();
    if name.ends_with("FAILURE") {
        Some(CanonicalState::Failure)
    } else if name.ends_with("UNKNOWN") {
        Some(CanonicalState::Unknown)
    } else {
        None
    }
}
