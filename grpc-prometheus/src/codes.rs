//! The gRPC status code domain and how handler outcomes map onto it.

use std::error::Error as StdError;
use tonic::{Code, Status};

/// Every status code a gRPC server can report, in numeric order.
///
/// The `grpc_server_handled_total` series are pre-registered for each of these.
pub const ALL_CODES: [Code; 17] = [
    Code::Ok,
    Code::Cancelled,
    Code::Unknown,
    Code::InvalidArgument,
    Code::DeadlineExceeded,
    Code::NotFound,
    Code::AlreadyExists,
    Code::PermissionDenied,
    Code::ResourceExhausted,
    Code::FailedPrecondition,
    Code::Aborted,
    Code::OutOfRange,
    Code::Unimplemented,
    Code::Internal,
    Code::Unavailable,
    Code::DataLoss,
    Code::Unauthenticated,
];

/// The value of the `grpc_code` label for the given code.
///
/// These are the canonical names used across gRPC implementations,
/// so dashboards can be shared with servers written in other languages.
pub const fn code_label(code: Code) -> &'static str {
    match code {
        Code::Ok => "OK",
        Code::Cancelled => "Canceled",
        Code::Unknown => "Unknown",
        Code::InvalidArgument => "InvalidArgument",
        Code::DeadlineExceeded => "DeadlineExceeded",
        Code::NotFound => "NotFound",
        Code::AlreadyExists => "AlreadyExists",
        Code::PermissionDenied => "PermissionDenied",
        Code::ResourceExhausted => "ResourceExhausted",
        Code::FailedPrecondition => "FailedPrecondition",
        Code::Aborted => "Aborted",
        Code::OutOfRange => "OutOfRange",
        Code::Unimplemented => "Unimplemented",
        Code::Internal => "Internal",
        Code::Unavailable => "Unavailable",
        Code::DataLoss => "DataLoss",
        Code::Unauthenticated => "Unauthenticated",
    }
}

/// Find the status code carried by an arbitrary error.
///
/// The error and its chain of sources are searched for a [`Status`].
/// Errors that don't carry one are reported as [`Code::Unknown`].
pub fn code_from_error(err: &(dyn StdError + 'static)) -> Code {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(status) = err.downcast_ref::<Status>() {
            return status.code();
        }
        current = err.source();
    }
    Code::Unknown
}

/// Errors returned by instrumented handlers.
///
/// Implemented for [`Status`] and boxed errors so that handlers can use
/// whichever error type their service already returns.
pub trait ToGrpcCode {
    fn to_grpc_code(&self) -> Code;
}

impl ToGrpcCode for Status {
    fn to_grpc_code(&self) -> Code {
        self.code()
    }
}

impl ToGrpcCode for Box<dyn StdError + Send + Sync + 'static> {
    fn to_grpc_code(&self) -> Code {
        let err: &(dyn StdError + 'static) = &**self;
        code_from_error(err)
    }
}

impl ToGrpcCode for std::io::Error {
    fn to_grpc_code(&self) -> Code {
        code_from_error(self)
    }
}

/// Successful results are always `OK`.
pub(crate) fn result_code<T, E: ToGrpcCode>(result: &Result<T, E>) -> Code {
    match result {
        Ok(_) => Code::Ok,
        Err(err) => err.to_grpc_code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Wrapped(Status);

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "wrapped: {}", self.0)
        }
    }

    impl StdError for Wrapped {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn codes_are_listed_in_numeric_order() {
        for (i, code) in ALL_CODES.iter().enumerate() {
            assert_eq!(*code as usize, i);
        }
    }

    #[test]
    fn labels_use_canonical_names() {
        assert_eq!(code_label(Code::Ok), "OK");
        assert_eq!(code_label(Code::Cancelled), "Canceled");
        assert_eq!(code_label(Code::NotFound), "NotFound");
    }

    #[test]
    fn finds_status_in_source_chain() {
        let err = Wrapped(Status::permission_denied("nope"));
        assert_eq!(code_from_error(&err), Code::PermissionDenied);

        let boxed: Box<dyn StdError + Send + Sync> = Box::new(Wrapped(Status::aborted("retry")));
        assert_eq!(boxed.to_grpc_code(), Code::Aborted);
    }

    #[test]
    fn unrecognized_errors_are_unknown() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        assert_eq!(err.to_grpc_code(), Code::Unknown);

        let boxed: Box<dyn StdError + Send + Sync> = "plain string error".into();
        assert_eq!(boxed.to_grpc_code(), Code::Unknown);
    }

    #[test]
    fn ok_results_are_ok() {
        let ok: Result<(), Status> = Ok(());
        assert_eq!(result_code(&ok), Code::Ok);
        let err: Result<(), Status> = Err(Status::not_found("missing"));
        assert_eq!(result_code(&err), Code::NotFound);
    }
}
