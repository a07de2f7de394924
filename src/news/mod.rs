pub mod calendar;
pub mod headlines;

pub use calendar::{active_lockdown_event, CalendarFeed, ForexFactoryCalendar, Impact, NewsEvent};
pub use headlines::{
    fresh_headlines, Headline, HeadlineFeed, JsonHeadlineFeed, NewsCategory, NewsPrefs,
};
