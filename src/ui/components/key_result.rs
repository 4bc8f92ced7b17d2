/// What a component did with a key.
///
/// Components return this to the view that owns them; `Event` carries
/// whatever the view has to act on (a submitted command, a confirmation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Key was consumed, nothing for the parent to do
  Handled,
  /// Key was consumed and produced an event for the parent
  Event(T),
  /// Key was not consumed, parent should try next handler
  NotHandled,
}
