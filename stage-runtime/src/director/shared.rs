//! 线程内共享的导演实例

use std::cell::RefCell;

use super::Director;

thread_local! {
    static SHARED_DIRECTOR: RefCell<Option<Director>> = const { RefCell::new(None) };
}

/// 访问当前线程的共享导演，首次访问时以默认配置创建
///
/// 回调内不能再次调用本函数。
pub fn with_shared_director<R>(f: impl FnOnce(&mut Director) -> R) -> R {
    SHARED_DIRECTOR.with(|cell| {
        let mut slot = cell.borrow_mut();
        let director = slot.get_or_insert_with(Director::default);
        f(director)
    })
}

/// 丢弃当前线程的共享导演，下次访问时重新创建
pub fn reset_shared_director() {
    SHARED_DIRECTOR.with(|cell| {
        cell.borrow_mut().take();
    });
}
