//! LoRA slot transition planning
//!
//! The swap cache exists to avoid redundant weight transfers: weights are
//! fetched at most once per distinct reference in a row. Planning is kept
//! pure so the policy can be tested without a pipeline.

/// A weight operation to perform against the pipeline, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoraAction {
    /// Remove the currently applied LoRA weights
    Unload,
    /// Fetch and apply weights for the given reference
    Load(String),
}

/// What happened to the LoRA slot while serving one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    /// Slot already matched the request; no weight transfer
    Unchanged,
    /// Requested weights are now applied
    Swapped,
    /// Slot was emptied because the request carried no reference
    Cleared,
    /// Loading failed; the request is served by the base model
    DegradedToBase,
}

/// Plan the weight operations that take the slot from `current` to
/// `requested`, returning the actions and the target slot state.
///
/// The target is the state the slot reaches when every action succeeds;
/// the executor downgrades it to empty when a load fails.
pub fn plan_transition(
    current: Option<&str>,
    requested: Option<&str>,
) -> (Vec<LoraAction>, Option<String>) {
    match (current, requested) {
        // Cache hit: the requested weights are already applied
        (Some(current), Some(requested)) if current == requested => {
            (vec![], Some(requested.to_string()))
        }
        (Some(_), Some(requested)) => (
            vec![LoraAction::Unload, LoraAction::Load(requested.to_string())],
            Some(requested.to_string()),
        ),
        (None, Some(requested)) => (
            vec![LoraAction::Load(requested.to_string())],
            Some(requested.to_string()),
        ),
        (Some(_), None) => (vec![LoraAction::Unload], None),
        (None, None) => (vec![], None),
    }
}
