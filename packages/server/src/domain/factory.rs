//! Domain factories for creating domain entities and value objects.

use rand::Rng;

use super::{RoomId, error::ValueObjectError};

/// Range of each numeric group of a room identifier
const GROUP_MIN: u16 = 100;
const GROUP_MAX: u16 = 999;

/// Factory for generating RoomId instances.
///
/// This factory encapsulates the logic for generating new room identifiers,
/// separating the generation concern from the validation logic in RoomId.
/// Uniqueness is checked by the room repository, not here.
pub struct RoomIdFactory;

impl RoomIdFactory {
    /// Generate a new RoomId made of three random groups in `100..=999`.
    ///
    /// # Errors
    ///
    /// This method should not fail in practice, but returns Result for consistency
    /// with the domain error handling pattern.
    pub fn generate() -> Result<RoomId, ValueObjectError> {
        let mut rng = rand::rng();
        let groups = [
            rng.random_range(GROUP_MIN..=GROUP_MAX),
            rng.random_range(GROUP_MIN..=GROUP_MAX),
            rng.random_range(GROUP_MIN..=GROUP_MAX),
        ];
        RoomId::from_groups(groups)
    }
}
