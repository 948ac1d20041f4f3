//! Background removal step. The processed image can be downloaded or
//! carried over to the analysis page.

use chrono::Utc;
use kalecheck_core::export::SEGMENTED_FILE_NAME;
use kalecheck_core::handoff;
use kalecheck_core::upload::{to_data_url, SEGMENTATION_PROGRESS};
use kalecheck_core::workflow::{self, SegmentationSession};
use kalecheck_core::{Alert, AnalysisBackend, KaleError, Stage, UploadFile};
use leptos::prelude::*;
use leptos_router::hooks::use_navigate;
use wasm_bindgen_futures::spawn_local;

use crate::api;
use crate::browser::{self, BrowserStorage, OwnedInterval};
use crate::components::alert_box::AlertBox;
use crate::components::drop_zone::DropZone;
use crate::components::progress_bar::ProgressBar;

#[component]
pub fn BackgroundSegmentationPage() -> impl IntoView {
    let session = RwSignal::new(workflow::new_segmentation_session());
    let alert = RwSignal::new(None::<Alert>);
    let navigate = StoredValue::new_local(use_navigate());

    let ticker = OwnedInterval::new();
    let stage = Memo::new(move |_| session.with(|s| s.stage()));
    let progress = Signal::derive(move || session.with(|s| s.progress()));
    let busy = Signal::derive(move || stage.get() == Stage::Submitting);

    let on_reject = Callback::new(move |e: KaleError| alert.set(Some(Alert::from(&e))));

    let on_file = Callback::new(move |file: UploadFile| {
        let outcome = session.try_update(|s| s.select_letterboxed(file));
        if let Some(Err(e)) = outcome {
            alert.set(Some(Alert::from(&e)));
        }
    });

    let on_remove = move |_| {
        let file = match session.try_update(SegmentationSession::begin_submit) {
            Some(Ok(file)) => file,
            Some(Err(e)) => {
                alert.set(Some(Alert::from(&e)));
                return;
            }
            None => return,
        };

        ticker.start(SEGMENTATION_PROGRESS.interval_ms, move || {
            let _ = session.try_update(|s| s.tick_progress());
        });
        spawn_local(async move {
            let outcome = match api::backend() {
                Ok(backend) => backend.segment(&file).await,
                Err(e) => Err(e),
            };
            ticker.stop();

            match session.try_update(|s| workflow::finish_segmentation(s, outcome)) {
                Some(Ok(true)) => {
                    alert.set(Some(Alert::success("Background removed successfully!")));
                }
                Some(Err(e)) => {
                    let _ = alert.try_set(Some(Alert::from(&e)));
                }
                _ => {}
            }
        });
    };

    let on_download = move |_| {
        let Some(processed) = session.with(|s| s.result().cloned()) else {
            return;
        };
        if let Err(e) = browser::download(&processed.bytes, &processed.mime, SEGMENTED_FILE_NAME) {
            alert.set(Some(Alert::error(e)));
        }
    };

    let on_continue = move |_| {
        let staged = session.with(|s| workflow::stage_for_analysis(s, &BrowserStorage, Utc::now()));
        match staged {
            Ok(token) => navigate.with_value(|nav| {
                nav(
                    &format!("/linear-regression{}", handoff::query_for(&token)),
                    Default::default(),
                )
            }),
            Err(e) => alert.set(Some(Alert::from(&e))),
        }
    };

    let on_reset = move |_| {
        if let Some(Err(e)) = session.try_update(|s| workflow::reset(s, &BrowserStorage)) {
            browser::log_error(&e.to_string());
        }
    };

    let preview = move || session.with(|s| s.preview_url().map(str::to_string));
    let processed_preview = move || {
        session.with(|s| s.result().map(|f| to_data_url(&f.bytes, &f.mime)))
    };

    view! {
        <div class="page segmentation-page">
            <h2>"Remove Background"</h2>
            <p class="page-description">
                "Isolate the kale leaf before analysis. Images are fitted onto a 512x512 canvas."
            </p>

            <AlertBox alert=alert />

            <Show
                when=move || stage.get() != Stage::Empty
                fallback=move || view! {
                    <DropZone
                        on_file=on_file
                        on_reject=on_reject
                        disabled=busy
                        input_id="segmentation-file-input"
                    />
                }
            >
                <div class="image-pair">
                    <figure>
                        {move || preview().map(|src| view! {
                            <img src=src class="preview-image" alt="Original" />
                        })}
                        <figcaption>"Original"</figcaption>
                    </figure>
                    {move || processed_preview().map(|src| view! {
                        <figure>
                            <img src=src class="preview-image" alt="Background removed" />
                            <figcaption>"Background removed"</figcaption>
                        </figure>
                    })}
                </div>

                <Show when=move || busy.get()>
                    <ProgressBar value=progress label="Removing background..." />
                </Show>

                {move || session.with(|s| s.error().map(str::to_string)).map(|msg| view! {
                    <p class="error-message">{msg}</p>
                })}

                <div class="action-buttons">
                    {move || match stage.get() {
                        Stage::Selected | Stage::Failed => view! {
                            <button class="btn btn-primary" on:click=on_remove>
                                {if stage.get() == Stage::Failed { "Try Again" } else { "Remove Background" }}
                            </button>
                        }.into_any(),
                        Stage::Succeeded => view! {
                            <button class="btn btn-secondary" on:click=on_download>"Download"</button>
                            <button class="btn btn-primary" on:click=on_continue>
                                "Continue to Analysis"
                            </button>
                        }.into_any(),
                        _ => ().into_any(),
                    }}
                    <button class="btn btn-secondary" on:click=on_reset disabled=move || busy.get()>
                        "Choose Different Image"
                    </button>
                </div>
            </Show>
        </div>
    }
}
