//! List of past analyses with per-row export and confirmed delete.

use kalecheck_core::HistoryRecord;
use leptos::prelude::*;

#[component]
pub fn HistoryList(
    /// Records to render, newest first.
    #[prop(into)]
    records: Signal<Vec<HistoryRecord>>,
    /// Called with the record id once the delete is confirmed.
    on_delete: Callback<String>,
    on_export: Callback<HistoryRecord>,
    #[prop(into)]
    empty_text: String,
) -> impl IntoView {
    // Row waiting on "are you sure".
    let confirming = RwSignal::new(None::<String>);

    view! {
        <div class="history-list">
            {move || {
                let records = records.get();
                if records.is_empty() {
                    view! { <p class="history-empty">{empty_text.clone()}</p> }.into_any()
                } else {
                    records.into_iter().map(|record| {
                        let (date, time) = record.display_time();
                        let ask_id = record.id.clone();
                        let confirm_id = record.id.clone();
                        let confirm_name = record.image_name.clone();
                        let export_record = record.clone();
                        view! {
                            <div class="history-item">
                                <img src=record.image_url.clone() class="history-thumb" alt=record.image_name.clone() />
                                <div class="history-item-info">
                                    <span class="history-name">{record.image_name.clone()}</span>
                                    <span class="history-date">{date} " " {time}</span>
                                    <span class="history-value">
                                        {format!("{:.2}% weight loss", record.percentage_weight_loss)}
                                    </span>
                                </div>
                                <details class="history-features">
                                    <summary>{format!("{} features", record.features.len())}</summary>
                                    <ul>
                                        {record.features.iter().map(|(name, value)| view! {
                                            <li>{name.clone()} ": " {format!("{:.2}", value)}</li>
                                        }).collect::<Vec<_>>()}
                                    </ul>
                                </details>
                                <div class="history-actions">
                                    <button
                                        class="btn btn-small btn-secondary"
                                        on:click=move |_| on_export.run(export_record.clone())
                                    >
                                        "Export"
                                    </button>
                                    <button
                                        class="btn btn-small btn-danger"
                                        on:click=move |_| confirming.set(Some(ask_id.clone()))
                                    >
                                        "Delete"
                                    </button>
                                </div>
                                {move || {
                                    let id = confirm_id.clone();
                                    let showing = confirming.with(|c| c.as_deref() == Some(id.as_str()));
                                    showing.then(|| view! {
                                        <div class="confirm-delete" role="alertdialog">
                                            <p>
                                                "Delete " <strong>{confirm_name.clone()}</strong>
                                                "? This action cannot be undone."
                                            </p>
                                            <div class="confirm-actions">
                                                <button
                                                    class="btn btn-small btn-secondary"
                                                    on:click=move |_| confirming.set(None)
                                                >
                                                    "Cancel"
                                                </button>
                                                <button
                                                    class="btn btn-small btn-danger"
                                                    on:click=move |_| {
                                                        confirming.set(None);
                                                        on_delete.run(id.clone());
                                                    }
                                                >
                                                    "Delete"
                                                </button>
                                            </div>
                                        </div>
                                    })
                                }}
                            </div>
                        }
                    }).collect::<Vec<_>>().into_any()
                }
            }}
        </div>
    }
}
