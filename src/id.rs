use std::sync::{Mutex, OnceLock};

use uuid::{ContextV7, Timestamp, Uuid};

static CONTEXT: OnceLock<Mutex<ContextV7>> = OnceLock::new();

/// Time-ordered ids keep `ORDER BY created_at, id` listings stable even when
/// records share a timestamp. The shared context makes ids generated in the
/// same millisecond monotonic within this process.
pub fn new_uuid_v7() -> String {
    let context = CONTEXT.get_or_init(|| Mutex::new(ContextV7::new()));
    let guard = context.lock().expect("uuid context mutex poisoned");
    Uuid::new_v7(Timestamp::now(&*guard)).to_string()
}
