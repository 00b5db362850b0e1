//! Room payload normalization for vendor searches.

use concierge_core::RoomRequest;

/// Age used to pad a child-age list that is shorter than the child count.
pub const DEFAULT_CHILD_AGE: u32 = 0;

/// Make every room's `age` list exactly `chd` long.
///
/// Short lists are padded with [`DEFAULT_CHILD_AGE`]; long lists are
/// truncated. A room with zero adults is given one, since the vendor rejects
/// adult-less rooms.
#[must_use]
pub fn normalize_rooms(rooms: &[RoomRequest]) -> Vec<RoomRequest> {
    rooms.iter().map(normalize_room).collect()
}

fn normalize_room(room: &RoomRequest) -> RoomRequest {
    let children = usize::try_from(room.chd).unwrap_or(usize::MAX);
    let mut age = room.age.clone();
    age.resize(children, DEFAULT_CHILD_AGE);
    RoomRequest {
        adt: room.adt.max(1),
        chd: room.chd,
        age,
    }
}
