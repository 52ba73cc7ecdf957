pub mod vehicle_controller;

pub use vehicle_controller::{
    ControllerState, SoldFilter, SubmitOutcome, VehicleController, DRAFT_LOCKED_MESSAGE,
};
