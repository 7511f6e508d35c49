use serde::{Deserialize, Serialize};

use crate::model::ids::BookingId;

/// Acknowledgement returned by the booking API for a persisted booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingReceipt {
    pub booking_id: BookingId,
    pub message: String,
    /// Follow-up instructions shown after booking (joining links, prep notes).
    #[serde(default)]
    pub follow_up: Vec<String>,
}
