//! Sample layouts, as version 0 codes.

pub const TEMPLATES: [&str; 3] = [
    "0CuHVzHFTHFXHW3UNHiNHVwHiKHiRHiUHW6HFaH3CDrH39H35HFQH32",
    "0CuHFTHFYHW4HVzUNH32HFQH35H38H3EHFcHiQHiNDrHVwHiKHW8HiWFjHFWH3BHW2HiT",
    "0CuHeFHeKHuqHul0lIeIPzINnINiINdIiMH7LH7HH7DUNHRoHeCHRrHRuHS0HeOI7CI79DrHuiI76I7IHuu1gH321jIe8FjHeIHRxHuoI7F",
];

pub fn template(index: usize) -> Option<&'static str> {
    TEMPLATES.get(index).copied()
}
