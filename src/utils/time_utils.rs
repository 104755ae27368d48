//! 时间工具模块
//! 提供时间处理相关的工具函数

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

static LAST_UNIQUE_MS: AtomicI64 = AtomicI64::new(0);

/// 获取当前时间戳（毫秒）
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// 进程内严格递增的毫秒时间戳
///
/// 同一毫秒内的第二次调用返回上一次的值 + 1，用于输出文件名去重。
pub fn unique_timestamp_millis() -> i64 {
    let now = current_timestamp_ms();
    let mut last = LAST_UNIQUE_MS.load(Ordering::Relaxed);
    loop {
        let next = if now > last { now } else { last + 1 };
        match LAST_UNIQUE_MS.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::Relaxed)
        {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}
