//! Service layer for the token server.
//!
//! - `room_service` - media service room API client

pub mod room_service;

pub use room_service::mock::MockRoomService;
pub use room_service::{RoomServiceClient, RoomServiceTrait};
