use leptos::prelude::*;

#[component]
pub fn HomePage() -> impl IntoView {
    view! {
        <div class="page home-page">
            <h2>"Welcome to KaleCheck"</h2>
            <p class="page-description">
                "Estimate how much weight a kale sample has lost from a single photo."
            </p>

            <div class="card-grid">
                <div class="card">
                    <h3>"Remove Background"</h3>
                    <p>"Isolate the leaf for a cleaner measurement"</p>
                    <a href="/background-segmentation" class="btn btn-primary">"Start Here"</a>
                </div>
                <div class="card">
                    <h3>"Analyze"</h3>
                    <p>"Predict percentage weight loss and inspect the extracted features"</p>
                    <a href="/linear-regression" class="btn btn-primary">"Analyze Now"</a>
                </div>
                <div class="card">
                    <h3>"History"</h3>
                    <p>"Review and export past results"</p>
                    <a href="/history" class="btn btn-primary">"View History"</a>
                </div>
            </div>

            <div class="how-it-works">
                <h3>"How It Works"</h3>
                <div class="steps">
                    <div class="step">
                        <span class="step-number">"1"</span>
                        <div class="step-content">
                            <strong>"Upload"</strong>
                            <p>"Drop a PNG or JPEG photo of the sample, up to 5MB"</p>
                        </div>
                    </div>
                    <div class="step">
                        <span class="step-number">"2"</span>
                        <div class="step-content">
                            <strong>"Segment"</strong>
                            <p>"Optionally remove the background, then continue to analysis"</p>
                        </div>
                    </div>
                    <div class="step">
                        <span class="step-number">"3"</span>
                        <div class="step-content">
                            <strong>"Analyze"</strong>
                            <p>"Get the predicted weight loss, saved to your history"</p>
                        </div>
                    </div>
                </div>
            </div>
        </div>
    }
}
