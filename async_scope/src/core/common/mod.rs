// Copyright (c) 2022-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod cancel_token;
pub mod common_atomic;
pub mod common_enums;
pub mod safe_lock;

// Re-export.
pub use cancel_token::*;
pub use common_atomic::*;
pub use common_enums::*;
pub use safe_lock::*;
