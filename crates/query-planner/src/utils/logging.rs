/// A wrapper around `tracing::trace!`, not to be confused with snapshot testing. It tags a trace
/// event with the name and serialized form of a planning data structure, so that external tools
/// can show how plans are built.
///
/// The value is serialized with serde_json and tagged with its type name:
/// ```ignore
/// snapshot!(plan, "planned operation");
/// // trace!(snapshot = "federation_query_planner::model::Plan", data = "{ .. }", "planned operation");
/// ```
///
/// Events are only emitted with the `snapshot_tracing` feature.
macro_rules! snapshot {
    ($value:expr, $msg:literal) => {
        #[cfg(feature = "snapshot_tracing")]
        match serde_json::to_string(&$value) {
            Ok(data) => tracing::trace!(
                snapshot = std::any::type_name_of_val(&$value),
                data = data.as_str(),
                $msg
            ),
            Err(error) => tracing::trace!(
                %error,
                snapshot_message = $msg,
                "could not serialize snapshot"
            ),
        }
    };
}

pub(crate) use snapshot;
