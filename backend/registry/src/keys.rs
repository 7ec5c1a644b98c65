//! Document keys: owner keys and generated push ids.

use std::sync::Mutex;

use rand::Rng;

/// Alphabet in ASCII order so that lexical order of ids equals creation order.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Derive the per-user path segment from an email or wallet identifier.
///
/// Path segments may not contain `.`, so emails have every `.` replaced by `,`.
pub fn owner_key(identifier: &str) -> String {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return "unknown".to_string();
    }
    trimmed.replace('.', ",")
}

/// Generates 20-character, time-ordered keys for append-with-generated-key writes.
///
/// The first 8 characters encode the millisecond timestamp; the remaining 12
/// are random and are incremented (rather than redrawn) when two ids are
/// generated within the same millisecond, so ids never collide in-process
/// and always sort in generation order.
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    last: Mutex<(i64, [u8; 12])>,
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> String {
        self.next_at(chrono::Utc::now().timestamp_millis())
    }

    fn next_at(&self, now_ms: i64) -> String {
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if now_ms == last.0 {
            increment(&mut last.1);
        } else {
            let mut rng = rand::thread_rng();
            for slot in last.1.iter_mut() {
                *slot = rng.gen_range(0..64);
            }
            last.0 = now_ms;
        }

        let mut id = Vec::with_capacity(20);
        let mut ts = now_ms.max(0) as u64;
        let mut stamp = [0u8; 8];
        for slot in stamp.iter_mut().rev() {
            *slot = PUSH_CHARS[(ts % 64) as usize];
            ts /= 64;
        }
        id.extend_from_slice(&stamp);
        id.extend(last.1.iter().map(|&i| PUSH_CHARS[i as usize]));

        String::from_utf8(id).unwrap_or_default()
    }
}

/// Base-64 increment with carry; wraps around on overflow.
fn increment(digits: &mut [u8; 12]) {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}
