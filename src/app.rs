use leptos::prelude::*;
use leptos_router::components::*;
use leptos_router::path;

use crate::components::navbar::Navbar;
use crate::pages::background_segmentation::BackgroundSegmentationPage;
use crate::pages::history::HistoryPage;
use crate::pages::home::HomePage;
use crate::pages::linear_regression::LinearRegressionPage;

#[component]
pub fn App() -> impl IntoView {
    view! {
        <Router>
            <style>{include_str!("app.css")}</style>
            <div class="app-layout">
                <Navbar />
                <main class="content">
                    <Routes fallback=|| view! { <p>"Page not found"</p> }>
                        <Route path=path!("/") view=HomePage />
                        <Route path=path!("/background-segmentation") view=BackgroundSegmentationPage />
                        <Route path=path!("/linear-regression") view=LinearRegressionPage />
                        <Route path=path!("/history") view=HistoryPage />
                    </Routes>
                </main>
            </div>
        </Router>
    }
}
