pub mod activity_window_filter;
pub mod demand_selector;
pub mod sold_styles_filter;
pub mod watchlist_selector;
