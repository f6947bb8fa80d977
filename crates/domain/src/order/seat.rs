use serde::{Deserialize, Serialize};

/// Seat class of a ticket.
///
/// Encoded on the wire as the ticketing system's integer code: `2` is first
/// class, `3` second class. Unknown codes are accepted and read as
/// [`SeatClass::Economy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum SeatClass {
    /// First class.
    Comfort,
    /// Second class.
    Economy,
}

impl SeatClass {
    pub const ALL: [SeatClass; 2] = [SeatClass::Comfort, SeatClass::Economy];

    pub fn from_code(code: i32) -> Self {
        match code {
            2 => SeatClass::Comfort,
            _ => SeatClass::Economy,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            SeatClass::Comfort => 2,
            SeatClass::Economy => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeatClass::Comfort => "Comfort",
            SeatClass::Economy => "Economy",
        }
    }
}

impl From<i32> for SeatClass {
    fn from(code: i32) -> Self {
        SeatClass::from_code(code)
    }
}

impl From<SeatClass> for i32 {
    fn from(class: SeatClass) -> Self {
        class.code()
    }
}

impl std::fmt::Display for SeatClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
