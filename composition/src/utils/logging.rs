/// This macro is a wrapper around `tracing::trace!` and should not be confused with our snapshot
/// testing. The primary goal of this macro is to add the necessary context to logging statements
/// so that external tools can show how the key data structures of a composition (the registry of
/// merged types, authorization data, field configurations) evolve over the course of a run.
///
/// There are two ways of creating a snapshot. The easiest is by passing the macro an identifier
/// for the value you'd like to take a snapshot of. This will tag the snapshot type with the type
/// name of the value, create data that is a JSON string using serde_json, and add the message
/// literal that you pass in. EX:
/// ```ignore
/// snapshot!(field_configurations, "generated field configurations");
/// // Generates:
/// // trace!(snapshot = "Vec<FieldConfiguration>", data = "[ .. ]", "generated field configurations");
/// ```
/// If you do not want to serialize the data, you can pass the name tag for the snapshot and data
/// in directly. Note that the data needs to implement the tracing crate's `Value` trait. Ideally,
/// this is a string representation of the data you're snapshotting. EX:
/// ```ignore
/// snapshot!("RouterSchema", router_sdl.as_str(), "printed router schema");
/// // Generates:
/// // trace!(snapshot = "RouterSchema", data = router_sdl.as_str(), "printed router schema");
/// ```
macro_rules! snapshot {
    ($value:expr, $msg:literal) => {
        #[cfg(feature = "snapshot_tracing")]
        tracing::trace!(
            snapshot = std::any::type_name_of_val(&$value),
            data = serde_json::to_string(&$value).unwrap_or_default(),
            $msg
        );
    };
    ($name:literal, $value:expr, $msg:literal) => {
        #[cfg(feature = "snapshot_tracing")]
        tracing::trace!(snapshot = $name, data = $value, $msg);
    };
}

pub(crate) use snapshot;
