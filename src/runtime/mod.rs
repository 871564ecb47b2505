//! Candidate interview runtime.
//!
//! [`machine`] holds the interview rules as a pure state machine, [`client`]
//! talks to the server, and [`driver`] wires both to devices and a screen.

pub mod client;
pub mod driver;
pub mod machine;

pub use client::{ClientError, InterviewApi};
pub use driver::{InterviewDriver, MediaDevices, Screen};
pub use machine::{Effect, Event, InterviewMachine, Phase, Recording, SubmissionPayload};
