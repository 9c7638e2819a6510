use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Station, StationId};

pub const BOOKING_DAYS: usize = 7;
pub const FIRST_HOUR: u8 = 8;
pub const LAST_HOUR: u8 = 22;

#[derive(Debug, Error, PartialEq)]
pub enum BookingError {
    #[error("Please select a time slot first.")]
    NoSlotSelected,

    #[error("This slot is already booked. Please choose another time.")]
    SlotTaken,

    #[error("Cannot {action} a reservation that is {status}")]
    InvalidTransition { action: ReservationAction, status: ReservationStatus },

    #[error("Reservation is already paid")]
    AlreadyPaid,

    #[error("Date out of range: {0}")]
    Date(String),
}

impl From<jiff::Error> for BookingError {
    fn from(err: jiff::Error) -> Self {
        BookingError::Date(err.to_string())
    }
}

// ** Slot booking **

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Pending,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: u64,
    pub station_id: StationId,
    pub station_name: String,
    pub station_address: String,
    pub date: Date,
    pub time: String,
    pub status: BookingStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub time: String,
    pub is_available: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DaySlots {
    pub date: Date,
    pub slots: Vec<Slot>,
}

pub fn slot_label(hour: u8) -> String {
    format!("{}:00 - {}:00", hour, hour + 1)
}

fn is_taken(bookings: &[Booking], station_id: StationId, date: Date, time: &str) -> bool {
    bookings.iter().any(|booking| {
        booking.status != BookingStatus::Cancelled
            && booking.station_id == station_id
            && booking.date == date
            && booking.time == time
    })
}

/// One week of hourly slots starting at `today`. A slot is unavailable when a
/// booking that was not cancelled already holds it.
pub fn generate_slots(today: Date, station_id: StationId, bookings: &[Booking]) -> Result<Vec<DaySlots>, BookingError> {
    let mut days = Vec::with_capacity(BOOKING_DAYS);
    let mut date = today;
    for day in 0..BOOKING_DAYS {
        if day > 0 {
            date = date.tomorrow()?;
        }
        let slots = (FIRST_HOUR..LAST_HOUR)
            .map(|hour| {
                let time = slot_label(hour);
                let is_available = !is_taken(bookings, station_id, date, &time);
                Slot { time, is_available }
            })
            .collect();
        days.push(DaySlots { date, slots });
    }
    Ok(days)
}

pub fn confirm_booking(
    station: &Station,
    date: Date,
    slot: Option<&Slot>,
    bookings: &[Booking],
) -> Result<Booking, BookingError> {
    let slot = slot.ok_or(BookingError::NoSlotSelected)?;
    if !slot.is_available || is_taken(bookings, station.id, date, &slot.time) {
        return Err(BookingError::SlotTaken);
    }

    let id = bookings.iter().map(|b| b.id).max().unwrap_or(0) + 1;
    log::info!("Booking {} confirmed at station {} on {} {}", id, station.id, date, slot.time);
    Ok(Booking {
        id,
        station_id: station.id,
        station_name: station.name.clone(),
        station_address: station.address.clone(),
        date,
        time: slot.time.clone(),
        status: BookingStatus::Confirmed,
    })
}

// ** Charging sessions **

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReservationStatus {
    Scheduled,
    Charging,
    Completed,
    Paid,
    Cancelled,
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReservationStatus::Scheduled => "SCHEDULED",
            ReservationStatus::Charging => "CHARGING",
            ReservationStatus::Completed => "COMPLETED",
            ReservationStatus::Paid => "PAID",
            ReservationStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReservationAction {
    Start,
    Stop,
    Pay,
}

impl ReservationAction {
    /// Last path segment of the backend endpoint.
    pub fn path(&self) -> &'static str {
        match self {
            ReservationAction::Start => "start",
            ReservationAction::Stop => "stop",
            ReservationAction::Pay => "pay",
        }
    }
}

impl std::fmt::Display for ReservationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    #[default]
    Card,
    Cash,
    Mobile,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: u64,
    pub status: ReservationStatus,
    /// kWh
    #[serde(default)]
    pub energy_consumed: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

impl ReservationStatus {
    /// Status after `action`, if the action is allowed from here.
    pub fn apply(self, action: ReservationAction, is_paid: bool) -> Result<ReservationStatus, BookingError> {
        match (self, action) {
            (ReservationStatus::Scheduled, ReservationAction::Start) => Ok(ReservationStatus::Charging),
            (ReservationStatus::Charging, ReservationAction::Stop) => Ok(ReservationStatus::Completed),
            (ReservationStatus::Completed, ReservationAction::Pay) if is_paid => Err(BookingError::AlreadyPaid),
            (ReservationStatus::Completed, ReservationAction::Pay) => Ok(ReservationStatus::Paid),
            (status, action) => Err(BookingError::InvalidTransition { action, status }),
        }
    }
}

impl Reservation {
    pub fn check(&self, action: ReservationAction) -> Result<ReservationStatus, BookingError> {
        self.status.apply(action, self.is_paid)
    }

    /// Actions the session page offers in the current state.
    pub fn available_actions(&self) -> Vec<ReservationAction> {
        [ReservationAction::Start, ReservationAction::Stop, ReservationAction::Pay]
            .into_iter()
            .filter(|action| self.check(*action).is_ok())
            .collect()
    }
}
