//! Past analyses: this browser's local list, plus the server copy when
//! signed in.

use kalecheck_core::export::{record_csv, record_file_name, REPORT_MIME};
use kalecheck_core::{Alert, HistoryRecord, LocalHistory};
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::api;
use crate::browser::{self, BrowserStorage};
use crate::components::alert_box::AlertBox;
use crate::components::history_list::HistoryList;

fn load_local() -> Result<Vec<HistoryRecord>, String> {
    LocalHistory::new(BrowserStorage).list().map_err(String::from)
}

#[component]
pub fn HistoryPage() -> impl IntoView {
    let alert = RwSignal::new(None::<Alert>);
    let (local, set_local) = signal(Vec::<HistoryRecord>::new());
    let (remote, set_remote) = signal(Vec::<HistoryRecord>::new());
    let (remote_loading, set_remote_loading) = signal(false);
    let signed_in = api::session_token().is_some();

    let refresh_remote = move || {
        if !signed_in {
            return;
        }
        set_remote_loading.set(true);
        spawn_local(async move {
            let loaded = match api::history_client() {
                Ok(client) => client.list().await,
                Err(e) => Err(e),
            };
            match loaded {
                Ok(records) => {
                    let _ = set_remote.try_set(records);
                }
                Err(e) => {
                    let _ = alert.try_set(Some(Alert::from(&e)));
                }
            }
            let _ = set_remote_loading.try_set(false);
        });
    };

    // Load both lists on mount
    Effect::new(move |_| {
        match load_local() {
            Ok(records) => set_local.set(records),
            Err(e) => alert.set(Some(Alert::error(e))),
        }
        refresh_remote();
    });

    let export_record = Callback::new(move |record: HistoryRecord| {
        let saved = record_csv(&record).map_err(String::from).and_then(|csv| {
            browser::download(csv.as_bytes(), REPORT_MIME, &record_file_name(&record.id))
        });
        if let Err(e) = saved {
            alert.set(Some(Alert::error(e)));
        }
    });

    let delete_local = Callback::new(move |id: String| {
        let history = LocalHistory::new(BrowserStorage);
        match history.delete(&id).and_then(|_| history.list()) {
            Ok(records) => {
                set_local.set(records);
                alert.set(Some(Alert::success("History entry deleted.")));
            }
            Err(e) => alert.set(Some(Alert::from(&e))),
        }
    });

    let clear_local = move |_| match LocalHistory::new(BrowserStorage).clear() {
        Ok(()) => {
            set_local.set(Vec::new());
            alert.set(Some(Alert::success("Local history cleared.")));
        }
        Err(e) => alert.set(Some(Alert::from(&e))),
    };

    let delete_remote = Callback::new(move |id: String| {
        spawn_local(async move {
            let deleted = match api::history_client() {
                Ok(client) => client.delete(&id).await,
                Err(e) => Err(e),
            };
            match deleted {
                Ok(()) => {
                    let _ = set_remote.try_update(|records| records.retain(|r| r.id != id));
                    let _ = alert.try_set(Some(Alert::success("History entry deleted.")));
                }
                Err(e) => {
                    let _ = alert.try_set(Some(Alert::from(&e)));
                }
            }
        });
    });

    view! {
        <div class="page history-page">
            <h2>"Analysis History"</h2>

            <AlertBox alert=alert />

            <section class="history-section">
                <div class="section-header">
                    <h3>"On this device"</h3>
                    <button
                        class="btn btn-small btn-secondary"
                        on:click=clear_local
                        disabled=move || local.with(Vec::is_empty)
                    >
                        "Clear"
                    </button>
                </div>
                <HistoryList
                    records=local
                    on_delete=delete_local
                    on_export=export_record
                    empty_text="No analyses saved on this device yet."
                />
            </section>

            <section class="history-section">
                <h3>"Your account"</h3>
                {if signed_in {
                    view! {
                        <Show
                            when=move || !remote_loading.get()
                            fallback=|| view! { <p class="history-loading">"Loading history..."</p> }
                        >
                            <HistoryList
                                records=remote
                                on_delete=delete_remote
                                on_export=export_record
                                empty_text="No prediction history found."
                            />
                        </Show>
                    }.into_any()
                } else {
                    view! {
                        <p class="history-empty">"Sign in to see the history saved to your account."</p>
                    }.into_any()
                }}
            </section>
        </div>
    }
}
