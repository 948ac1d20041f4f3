//! Transient banner for the latest success, warning or error.

use kalecheck_core::notice::ALERT_DISMISS_MS;
use kalecheck_core::Alert;
use leptos::prelude::*;

use crate::browser;

/// Shows `alert` while it is `Some` and clears it after
/// [`ALERT_DISMISS_MS`]. A newer alert restarts the countdown.
#[component]
pub fn AlertBox(alert: RwSignal<Option<Alert>>) -> impl IntoView {
    let dismiss_timeout = StoredValue::new(None::<i32>);

    Effect::new(move |_| {
        if let Some(id) = dismiss_timeout.get_value() {
            browser::clear_timeout(id);
        }
        if alert.with(Option::is_some) {
            let id = browser::set_timeout(ALERT_DISMISS_MS, move || {
                let _ = alert.try_set(None);
            });
            dismiss_timeout.set_value(id);
        }
    });

    on_cleanup(move || {
        if let Some(id) = dismiss_timeout.try_get_value().flatten() {
            browser::clear_timeout(id);
        }
    });

    view! {
        {move || alert.get().map(|a| view! {
            <div class=a.kind.css_class() role="alert">
                <strong class="alert-title">{a.kind.title()}</strong>
                <span class="alert-message">{a.message.clone()}</span>
                <button class="alert-close" on:click=move |_| alert.set(None)>"\u{00d7}"</button>
            </div>
        })}
    }
}
