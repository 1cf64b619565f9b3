//! Script expressions that call into the launcher's in-page APIs.
//!
//! Both the launcher window and every instance window expose a global object
//! whose async methods implement the RPC surface. Arguments are passed as JSON
//! literals, which are valid JavaScript.

use serde_json::Value;

/// Global exposed by the launcher window
pub const LAUNCHER_API: &str = "globalThis.lhLauncher";

/// Global exposed by each instance window
pub const INSTANCE_API: &str = "globalThis.lhInstance";

/// Build an expression that awaits `api.method(args...)` and returns its value.
///
/// A missing API object or method throws, which surfaces as an evaluation
/// error instead of an `undefined` result.
pub fn invoke(api: &str, method: &str, args: &[Value]) -> String {
    let args = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "(async () => {{ \
            const api = {api}; \
            if (!api || typeof api.{method} !== 'function') {{ \
                throw new Error('{api}.{method} is not available'); \
            }} \
            return await api.{method}({args}); \
        }})()"
    )
}
