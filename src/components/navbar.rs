use leptos::prelude::*;

#[component]
pub fn Navbar() -> impl IntoView {
    view! {
        <nav class="navbar">
            <div class="navbar-brand">
                <a href="/" class="navbar-title">"KaleCheck"</a>
                <span class="navbar-subtitle">"Kale Quality Analysis"</span>
            </div>
            <ul class="nav-list">
                <li class="nav-item">
                    <a href="/" class="nav-link">"Home"</a>
                </li>
                <li class="nav-item">
                    <a href="/background-segmentation" class="nav-link">"Remove Background"</a>
                </li>
                <li class="nav-item">
                    <a href="/linear-regression" class="nav-link">"Analyze"</a>
                </li>
                <li class="nav-item">
                    <a href="/history" class="nav-link">"History"</a>
                </li>
            </ul>
        </nav>
    }
}
