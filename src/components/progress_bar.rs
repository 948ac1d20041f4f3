use leptos::prelude::*;

#[component]
pub fn ProgressBar(
    #[prop(into)] value: Signal<u8>,
    /// Caption shown under the bar, e.g. "Analyzing..."
    #[prop(into)]
    label: String,
) -> impl IntoView {
    view! {
        <div class="progress">
            <div class="progress-track">
                <div
                    class="progress-fill"
                    style=move || format!("width: {}%", value.get())
                ></div>
            </div>
            <p class="progress-label">{label} " " {move || format!("{}%", value.get())}</p>
        </div>
    }
}
