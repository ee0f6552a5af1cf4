// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Client mirror of the contact form.
//!
//! The page-side behaviour expressed against small traits so it can run
//! headless: an advisory cooldown keyed by browser fingerprint, the
//! countdown on the submit control, and the submission flow itself.

pub mod api;
pub mod countdown;
pub mod fingerprint;
pub mod flow;

pub use api::{ApiError, ApiReply, ContactApi, HttpContactApi};
pub use countdown::{CountdownDisplay, CountdownPresenter, SubmitControl, Tone};
pub use fingerprint::BrowserTraits;
pub use flow::{ContactFlow, FlowState, SubmitOutcome};
