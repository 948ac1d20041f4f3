//! Drag-and-drop or browse file picker.

use kalecheck_core::upload::validate_selection;
use kalecheck_core::{KaleError, UploadFile};
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

use crate::browser;

/// Selection gate run on the browser's file metadata, so a rejected file
/// is never read into memory.
fn check_before_read(name: &str, mime: &str, size: f64) -> Result<(), KaleError> {
    validate_selection(name, mime, size.max(0.0).ceil() as u64)
}

/// Reads the first dropped or chosen file and hands it to `on_file`.
/// Files failing the selection gate go to `on_reject` unread.
#[component]
pub fn DropZone(
    on_file: Callback<UploadFile>,
    on_reject: Callback<KaleError>,
    /// Ignore input while a request is in flight.
    #[prop(into)]
    disabled: Signal<bool>,
    /// Id for the hidden `<input>`; must be unique on the page.
    #[prop(into)]
    input_id: String,
) -> impl IntoView {
    let (is_over, set_is_over) = signal(false);
    let (is_loading, set_is_loading) = signal(false);

    let load = move |file: web_sys::File| {
        if let Err(e) = check_before_read(&file.name(), &file.type_(), file.size()) {
            on_reject.run(e);
            return;
        }
        set_is_loading.set(true);
        spawn_local(async move {
            match browser::read_file(file).await {
                Ok(upload) => on_file.run(upload),
                Err(e) => {
                    browser::log_error(&e);
                    on_reject.run(KaleError::Validation(e));
                }
            }
            let _ = set_is_loading.try_set(false);
        });
    };

    let on_drop = move |ev: web_sys::DragEvent| {
        ev.prevent_default();
        set_is_over.set(false);
        if disabled.get_untracked() {
            return;
        }
        if let Some(file) = ev
            .data_transfer()
            .and_then(|dt| dt.files())
            .and_then(|files| files.get(0))
        {
            load(file);
        }
    };

    let on_input_change = move |ev: web_sys::Event| {
        let Some(input) = ev
            .target()
            .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
        else {
            return;
        };
        if let Some(file) = input.files().and_then(|files| files.get(0)) {
            load(file);
        }
        // Allow picking the same file again after a reset.
        input.set_value("");
    };

    let label_for = input_id.clone();

    view! {
        <div
            class="drop-zone"
            class:drop-zone-active=move || is_over.get()
            class:drop-zone-disabled=move || disabled.get()
            on:dragover=move |ev: web_sys::DragEvent| {
                ev.prevent_default();
                set_is_over.set(true);
            }
            on:dragleave=move |_| set_is_over.set(false)
            on:drop=on_drop
        >
            <Show
                when=move || is_loading.get()
                fallback=move || view! {
                    <div class="drop-zone-content">
                        <p class="drop-main">"Drag and drop a kale image here"</p>
                        <p class="drop-hint">"or"</p>
                        <label for=label_for.clone() class="btn btn-secondary">
                            "Browse Files"
                        </label>
                        <input
                            type="file"
                            id=input_id.clone()
                            accept=".png,.jpg,.jpeg,image/png,image/jpeg"
                            style="display: none"
                            disabled=move || disabled.get()
                            on:change=on_input_change.clone()
                        />
                        <p class="drop-formats">"PNG, JPG or JPEG, up to 5MB"</p>
                    </div>
                }
            >
                <div class="drop-zone-loading-content">
                    <div class="spinner"></div>
                    <p>"Loading image..."</p>
                </div>
            </Show>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kalecheck_core::upload::MAX_FILE_BYTES;

    #[test]
    fn test_oversized_file_rejected_from_metadata() {
        let err = check_before_read("kale.png", "image/png", (MAX_FILE_BYTES + 1) as f64).unwrap_err();
        assert_eq!(err.to_string(), "File size should be less than 5MB");
    }

    #[test]
    fn test_gate_order_matches_selection() {
        let err = check_before_read("kale.gif", "text/plain", 1e9).unwrap_err();
        assert_eq!(err.to_string(), "Only PNG, JPG, and JPEG files are allowed.");
        assert!(check_before_read("kale.jpg", "image/jpeg", MAX_FILE_BYTES as f64).is_ok());
    }
}
