//! Orchestration of one user-invoked sync operation.
//!
//! A [`Commandlet`] sequences precondition check, parameter gathering,
//! execution, and postcondition check; [`OperationServices`] is the only
//! place that talks to both the process executor and the result parsers.
//! Hosts plug in through the seams in [`traits`] and [`sinks`].

pub mod commandlet;
pub mod executor;
pub mod settings;
pub mod sinks;
pub mod traits;

pub use commandlet::{Commandlet, CommandletOutcome, CommandletState};
pub use executor::{
    OperationExecutor, OperationReport, OperationServices, OperationStatus, ResultFamily,
};
pub use settings::Settings;
pub use sinks::{
    ChannelSink, NotificationSink, TelemetrySink, TracingChannelSink, TracingNotificationSink,
    TracingTelemetrySink,
};
pub use traits::{
    CommandletExecutor, EmptyPostChecker, EmptyPreChecker, ParameterResponse, ParametersGatherer,
    PostconditionChecker, PreconditionChecker,
};
