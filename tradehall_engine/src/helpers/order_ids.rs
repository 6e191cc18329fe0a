use crate::db_types::OrderId;

/// Generates a fresh order identifier.
///
/// The original scheme concatenated wall-clock microseconds with the guild and user ids, which is not
/// collision-resistant under concurrent requests. A random 128-bit identifier is.
pub fn new_order_id() -> OrderId {
    let id: u128 = rand::random();
    OrderId(format!("{id:032x}"))
}
