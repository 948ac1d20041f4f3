//! DOM plumbing: `localStorage`, file reading, downloads and timers.

use js_sys::{Array, ArrayBuffer, Uint8Array};
use kalecheck_core::{KaleError, KeyValueStore, UploadFile};
use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// [`KeyValueStore`] over `window.localStorage`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserStorage;

impl BrowserStorage {
    fn storage(&self) -> Result<web_sys::Storage, KaleError> {
        web_sys::window()
            .ok_or_else(|| KaleError::Storage("No window".to_string()))?
            .local_storage()
            .map_err(|e| KaleError::Storage(format!("localStorage unavailable: {:?}", e)))?
            .ok_or_else(|| KaleError::Storage("localStorage unavailable".to_string()))
    }
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Result<Option<String>, KaleError> {
        self.storage()?
            .get_item(key)
            .map_err(|e| KaleError::Storage(format!("Failed to read {}: {:?}", key, e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KaleError> {
        // Quota errors surface here (large data URLs).
        self.storage()?
            .set_item(key, value)
            .map_err(|e| KaleError::Storage(format!("Failed to write {}: {:?}", key, e)))
    }

    fn remove(&self, key: &str) -> Result<(), KaleError> {
        self.storage()?
            .remove_item(key)
            .map_err(|e| KaleError::Storage(format!("Failed to remove {}: {:?}", key, e)))
    }
}

/// Read a picked or dropped file into memory.
pub async fn read_file(file: web_sys::File) -> Result<UploadFile, String> {
    let array_buffer: ArrayBuffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| format!("Failed to read file: {:?}", e))?
        .dyn_into()
        .map_err(|_| "Failed to convert to ArrayBuffer")?;

    let bytes = Uint8Array::new(&array_buffer).to_vec();
    Ok(UploadFile::new(file.name(), file.type_(), bytes))
}

/// Save `bytes` through a temporary object URL and a synthetic link click.
pub fn download(bytes: &[u8], mime: &str, file_name: &str) -> Result<(), String> {
    let window = web_sys::window().ok_or("No window")?;
    let document = window.document().ok_or("No document")?;

    let parts = Array::new();
    parts.push(&Uint8Array::from(bytes));
    let options = web_sys::BlobPropertyBag::new();
    options.set_type(mime);
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)
        .map_err(|e| format!("Failed to create file: {:?}", e))?;

    let url = web_sys::Url::create_object_url_with_blob(&blob)
        .map_err(|e| format!("Failed to create download link: {:?}", e))?;
    let link: web_sys::HtmlAnchorElement = document
        .create_element("a")
        .map_err(|e| format!("{:?}", e))?
        .dyn_into()
        .map_err(|_| "Failed to create download link")?;
    link.set_href(&url);
    link.set_download(file_name);
    link.click();
    let _ = web_sys::Url::revoke_object_url(&url);
    Ok(())
}

/// `document.cookie`, or empty outside an HTML document.
pub fn cookies() -> String {
    web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.dyn_into::<web_sys::HtmlDocument>().ok())
        .and_then(|d| d.cookie().ok())
        .unwrap_or_default()
}

pub fn log_error(message: &str) {
    web_sys::console::error_1(&message.into());
}

/// A `setInterval` registration, cleared on drop.
pub struct Interval {
    id: i32,
    _callback: Closure<dyn FnMut()>,
}

impl Interval {
    pub fn start(period_ms: u32, tick: impl FnMut() + 'static) -> Option<Self> {
        let callback = Closure::wrap(Box::new(tick) as Box<dyn FnMut()>);
        let id = web_sys::window()?
            .set_interval_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                period_ms as i32,
            )
            .ok()?;
        Some(Self {
            id,
            _callback: callback,
        })
    }
}

impl Drop for Interval {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            window.clear_interval_with_handle(self.id);
        }
    }
}

/// Progress timer slot owned by the component that created it. A running
/// interval is cleared when the request finishes or when the component is
/// torn down, whichever comes first.
#[derive(Clone, Copy)]
pub struct OwnedInterval(StoredValue<Option<Interval>, LocalStorage>);

impl OwnedInterval {
    pub fn new() -> Self {
        let slot = StoredValue::new_local(None::<Interval>);
        on_cleanup(move || {
            let _ = slot.try_update_value(|running| *running = None);
        });
        Self(slot)
    }

    /// Replace any running interval with a new one.
    pub fn start(&self, period_ms: u32, tick: impl FnMut() + 'static) {
        let interval = Interval::start(period_ms, tick);
        let _ = self.0.try_update_value(|running| *running = interval);
    }

    pub fn stop(&self) {
        let _ = self.0.try_update_value(|running| *running = None);
    }
}

/// Run `f` once after `delay_ms`. Returns the timeout handle.
pub fn set_timeout(delay_ms: u32, f: impl FnOnce() + 'static) -> Option<i32> {
    let callback = Closure::once(f);
    let id = web_sys::window()?
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            delay_ms as i32,
        )
        .ok()?;
    callback.forget();
    Some(id)
}

pub fn clear_timeout(id: i32) {
    if let Some(window) = web_sys::window() {
        window.clear_timeout_with_handle(id);
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use wasm_bindgen_test::*;

    use super::*;

    wasm_bindgen_test_configure!(run_in_browser);

    async fn sleep(ms: i32) {
        let promise = js_sys::Promise::new(&mut |resolve, _| {
            if let Some(window) = web_sys::window() {
                let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms);
            }
        });
        let _ = JsFuture::from(promise).await;
    }

    fn counting_timer(owner: &Owner, ticks: &Rc<Cell<u32>>) -> OwnedInterval {
        let counter = Rc::clone(ticks);
        owner.with(|| {
            let timer = OwnedInterval::new();
            timer.start(10, move || counter.set(counter.get() + 1));
            timer
        })
    }

    #[wasm_bindgen_test]
    async fn test_interval_cleared_when_owner_disposed() {
        let owner = Owner::new();
        let ticks = Rc::new(Cell::new(0));
        let _timer = counting_timer(&owner, &ticks);

        sleep(60).await;
        assert!(ticks.get() > 0);

        owner.cleanup();
        let seen = ticks.get();
        sleep(60).await;
        assert_eq!(ticks.get(), seen);
    }

    #[wasm_bindgen_test]
    async fn test_stop_clears_interval() {
        let owner = Owner::new();
        let ticks = Rc::new(Cell::new(0));
        let timer = counting_timer(&owner, &ticks);

        timer.stop();
        let seen = ticks.get();
        sleep(60).await;
        assert_eq!(ticks.get(), seen);
    }
}
