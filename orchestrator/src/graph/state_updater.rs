//! State updater: customizes how a node's returned state is merged into the
//! graph's running state. Default behavior fully replaces the state.

use std::fmt::Debug;
use std::sync::Arc;

/// Trait for customizing how state updates are applied.
///
/// The default implementation (`ReplaceUpdater`) simply replaces the entire state.
pub trait StateUpdater<S>: Send + Sync + Debug
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Merges a node's output (`update`) into the running state (`current`).
    fn apply_update(&self, current: &mut S, update: &S);
}

/// Default state updater: the node's return value completely replaces the previous state.
#[derive(Debug, Clone, Default)]
pub struct ReplaceUpdater;

impl<S> StateUpdater<S> for ReplaceUpdater
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn apply_update(&self, current: &mut S, update: &S) {
        *current = update.clone();
    }
}

/// A state updater that applies updates via a registered merge function, allowing
/// different fields to use different strategies (e.g. replace vs. append).
pub struct FieldBasedUpdater<S, F>
where
    S: Clone + Send + Sync + Debug + 'static,
    F: Fn(&mut S, &S) + Send + Sync + 'static,
{
    updater_fn: F,
    _marker: std::marker::PhantomData<S>,
}

impl<S, F> Debug for FieldBasedUpdater<S, F>
where
    S: Clone + Send + Sync + Debug + 'static,
    F: Fn(&mut S, &S) + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBasedUpdater")
            .field("updater_fn", &"<function>")
            .finish()
    }
}

impl<S, F> FieldBasedUpdater<S, F>
where
    S: Clone + Send + Sync + Debug + 'static,
    F: Fn(&mut S, &S) + Send + Sync + 'static,
{
    pub fn new(updater_fn: F) -> Self {
        Self {
            updater_fn,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<S, F> StateUpdater<S> for FieldBasedUpdater<S, F>
where
    S: Clone + Send + Sync + Debug + 'static,
    F: Fn(&mut S, &S) + Send + Sync + 'static,
{
    fn apply_update(&self, current: &mut S, update: &S) {
        (self.updater_fn)(current, update);
    }
}

/// Boxed state updater for type erasure; stored on `StateGraph`/`CompiledStateGraph`.
pub type BoxedStateUpdater<S> = Arc<dyn StateUpdater<S>>;

pub fn boxed_updater<S, U>(updater: U) -> BoxedStateUpdater<S>
where
    S: Clone + Send + Sync + Debug + 'static,
    U: StateUpdater<S> + 'static,
{
    Arc::new(updater)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct TestState {
        messages: Vec<String>,
        count: i32,
    }

    #[test]
    fn replace_updater_replaces_entire_state() {
        let updater = ReplaceUpdater;
        let mut current = TestState { messages: vec!["old".into()], count: 10 };
        let update = TestState { messages: vec!["new".into()], count: 20 };
        updater.apply_update(&mut current, &update);
        assert_eq!(current, TestState { messages: vec!["new".into()], count: 20 });
    }

    #[test]
    fn field_based_updater_can_append() {
        let updater = FieldBasedUpdater::new(|current: &mut TestState, update: &TestState| {
            current.messages.extend(update.messages.iter().cloned());
            current.count = update.count;
        });
        let mut current = TestState { messages: vec!["msg1".into()], count: 10 };
        let update = TestState { messages: vec!["msg2".into()], count: 20 };
        updater.apply_update(&mut current, &update);
        assert_eq!(current.messages, vec!["msg1".to_string(), "msg2".to_string()]);
        assert_eq!(current.count, 20);
    }

    #[test]
    fn boxed_updater_erases_type() {
        let updater: BoxedStateUpdater<TestState> = boxed_updater(ReplaceUpdater);
        let mut current = TestState { messages: vec!["old".into()], count: 10 };
        let update = TestState { messages: vec!["new".into()], count: 20 };
        updater.apply_update(&mut current, &update);
        assert_eq!(current.count, 20);
    }
}
