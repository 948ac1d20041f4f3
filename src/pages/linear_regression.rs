//! Weight-loss analysis step: submit an image, show the prediction and
//! its features, export a CSV report.

use chrono::Utc;
use kalecheck_core::export::{REPORT_FILE_NAME, REPORT_MIME};
use kalecheck_core::handoff;
use kalecheck_core::upload::ANALYSIS_PROGRESS;
use kalecheck_core::workflow::{self, AnalysisSession};
use kalecheck_core::{Alert, AnalysisBackend, AnalysisData, KaleError, Stage, UploadFile};
use leptos::prelude::*;
use leptos_router::hooks::use_query_map;
use wasm_bindgen_futures::spawn_local;

use crate::api;
use crate::browser::{self, BrowserStorage, OwnedInterval};
use crate::components::alert_box::AlertBox;
use crate::components::drop_zone::DropZone;
use crate::components::progress_bar::ProgressBar;

#[component]
pub fn LinearRegressionPage() -> impl IntoView {
    let session = RwSignal::new(workflow::new_analysis_session());
    let alert = RwSignal::new(None::<Alert>);
    let query = use_query_map();

    let ticker = OwnedInterval::new();
    let stage = Memo::new(move |_| session.with(|s| s.stage()));
    let progress = Signal::derive(move || session.with(|s| s.progress()));
    let busy = Signal::derive(move || stage.get() == Stage::Submitting);

    // Adopt an image handed over from the background removal page.
    Effect::new(move |_| {
        let nav_token = query.with_untracked(|q| q.get(handoff::QUERY_PARAM));
        match session
            .try_update(|s| workflow::adopt_handoff(s, &BrowserStorage, nav_token.as_deref()))
        {
            Some(Ok(true)) => alert.set(Some(Alert::info(
                "Background-removed image loaded. Click Analyze to continue.",
            ))),
            Some(Err(e)) => alert.set(Some(Alert::from(&e))),
            _ => {}
        }
    });

    let on_reject = Callback::new(move |e: KaleError| alert.set(Some(Alert::from(&e))));

    let on_file = Callback::new(move |file: UploadFile| {
        let outcome =
            session.try_update(|s| workflow::select_for_analysis(s, &BrowserStorage, file));
        if let Some(Err(e)) = outcome {
            alert.set(Some(Alert::from(&e)));
        }
    });

    let on_analyze = move |_| {
        let file = match session.try_update(AnalysisSession::begin_submit) {
            Some(Ok(file)) => file,
            Some(Err(e)) => {
                alert.set(Some(Alert::from(&e)));
                return;
            }
            None => return,
        };

        ticker.start(ANALYSIS_PROGRESS.interval_ms, move || {
            let _ = session.try_update(|s| s.tick_progress());
        });
        spawn_local(async move {
            let outcome = match api::backend() {
                Ok(backend) => backend.predict(&file).await,
                Err(e) => Err(e),
            };
            ticker.stop();

            let finished = session.try_update(|s| {
                workflow::finish_analysis(s, &BrowserStorage, outcome, Utc::now())
            });
            match finished {
                Some(Ok(Some(_))) => {
                    alert.set(Some(Alert::success("Analysis completed successfully!")));
                }
                Some(Err(e)) => {
                    let _ = alert.try_set(Some(Alert::from(&e)));
                }
                _ => {}
            }
        });
    };

    let on_export = move |_| {
        let report = session.with(workflow::export_report);
        let saved = report
            .map_err(String::from)
            .and_then(|csv| browser::download(csv.as_bytes(), REPORT_MIME, REPORT_FILE_NAME));
        match saved {
            Ok(()) => alert.set(Some(Alert::success("Report downloaded."))),
            Err(e) => alert.set(Some(Alert::error(e))),
        }
    };

    let on_reset = move |_| {
        if let Some(Err(e)) = session.try_update(|s| workflow::reset(s, &BrowserStorage)) {
            browser::log_error(&e.to_string());
        }
    };

    let preview = move || session.with(|s| s.preview_url().map(str::to_string));
    let result = move || session.with(|s| s.result().cloned());

    view! {
        <div class="page analysis-page">
            <h2>"Weight Loss Analysis"</h2>
            <p class="page-description">
                "Upload a kale image to predict its percentage weight loss."
            </p>

            <AlertBox alert=alert />

            <Show
                when=move || stage.get() != Stage::Empty
                fallback=move || view! {
                    <DropZone
                        on_file=on_file
                        on_reject=on_reject
                        disabled=busy
                        input_id="analysis-file-input"
                    />
                }
            >
                <div class="analysis-preview">
                    {move || preview().map(|src| view! {
                        <img src=src class="preview-image" alt="Kale sample" />
                    })}
                    <p class="file-name">
                        {move || session.with(|s| s.file().map(|f| f.name.clone()).unwrap_or_default())}
                    </p>
                </div>

                <Show when=move || busy.get()>
                    <ProgressBar value=progress label="Analyzing..." />
                </Show>

                {move || session.with(|s| s.error().map(str::to_string)).map(|msg| view! {
                    <p class="error-message">{msg}</p>
                })}

                {move || result().map(|data| view! { <AnalysisResult data=data /> })}

                <div class="action-buttons">
                    {move || match stage.get() {
                        Stage::Selected | Stage::Failed => view! {
                            <button class="btn btn-primary" on:click=on_analyze>
                                {if stage.get() == Stage::Failed { "Try Again" } else { "Analyze" }}
                            </button>
                        }.into_any(),
                        Stage::Succeeded => view! {
                            <button class="btn btn-primary" on:click=on_export>"Export CSV"</button>
                        }.into_any(),
                        _ => ().into_any(),
                    }}
                    <button class="btn btn-secondary" on:click=on_reset disabled=move || busy.get()>
                        "Analyze Another Image"
                    </button>
                </div>
            </Show>
        </div>
    }
}

#[component]
fn AnalysisResult(data: AnalysisData) -> impl IntoView {
    view! {
        <div class="analysis-result">
            <div class="result-headline">
                <span class="result-label">"Predicted weight loss"</span>
                <span class="result-value">{format!("{:.2}%", data.percentage_weight_loss)}</span>
            </div>
            <table class="feature-table">
                <thead>
                    <tr><th>"Feature"</th><th>"Value"</th></tr>
                </thead>
                <tbody>
                    {data.features.iter().map(|(name, value)| view! {
                        <tr>
                            <td>{name.clone()}</td>
                            <td>{format!("{:.2}", value)}</td>
                        </tr>
                    }).collect::<Vec<_>>()}
                </tbody>
            </table>
        </div>
    }
}
