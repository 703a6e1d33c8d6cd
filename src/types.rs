/// Position of an event inside its stream. Version `0` is an empty stream, the first event
/// appended to a stream carries version `1`.
pub type StreamVersion = i64;
