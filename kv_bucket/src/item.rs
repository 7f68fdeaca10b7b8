use kv_common::Content;

/// A document as handed to the engine by a mutation
pub struct Item {
    pub key: String,
    pub value: Content,
    /// Seconds since the unix epoch, 0 for no expiry
    pub expiry_time: u32,
}
