//! Pure device-domain types: channels, parameters, unit conversions, and
//! custom pulse trains. No I/O and no wire formatting lives here.

pub mod params;
pub mod train;
pub mod units;

pub use params::{
    ChannelParameters, OutputChannel, OutputParam, ParamKind, ParamValue, ParameterError,
    ParameterStore, TriggerChannel, TriggerMode, TriggerParameters,
};
pub use train::{CustomTrain, Pulse, TrainSlot};
pub use units::HardwareGeneration;
