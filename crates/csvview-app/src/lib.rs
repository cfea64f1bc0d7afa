// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod charts;
pub mod deferred;
pub mod forms;
pub mod ids;
pub mod model;
pub mod projection;
pub mod state;
pub mod table;

pub use charts::*;
pub use deferred::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use projection::*;
pub use state::*;
pub use table::*;
