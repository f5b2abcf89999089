//! Admission control for incoming connection requests.

pub mod admission;

pub use admission::{
    policy_from_config, AcceptAll, Admission, AdmissionPolicy, ConnectionLimits, RejectReason,
};
