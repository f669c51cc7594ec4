//! Static word tables: the secret-word pool, clues, and the association lists
//! bots draw on. Lookups are case-insensitive.

/// Secret words a game can be played with
pub const WORD_POOL: &[&str] = &[
    "Dog",
    "Cat",
    "Pizza",
    "Beach",
    "Mountain",
    "Car",
    "Plane",
    "Book",
    "Music",
    "Football",
    "Computer",
    "Coffee",
    "Chocolate",
    "Moon",
    "Sun",
    "Tree",
    "Flower",
    "River",
    "Sea",
    "City",
    "House",
    "School",
    "Hospital",
    "Park",
    "Cinema",
    "Restaurant",
    "Winter",
    "Summer",
    "Spring",
    "Autumn",
    "Rain",
    "Snow",
];

pub const NO_CLUE: &str = "No clue";

const CLUES: &[(&str, &str)] = &[
    ("Dog", "Pet animal"),
    ("Cat", "Pet animal"),
    ("Pizza", "Italian food"),
    ("Beach", "Holiday place"),
    ("Mountain", "Natural place"),
    ("Car", "Vehicle"),
    ("Plane", "Vehicle"),
    ("Book", "Reading object"),
    ("Music", "Art of sound"),
    ("Football", "Sport"),
    ("Computer", "Technology"),
    ("Coffee", "Drink"),
    ("Chocolate", "Sweet"),
    ("Moon", "Celestial body"),
    ("Sun", "Celestial body"),
    ("Tree", "Plant"),
    ("Flower", "Plant"),
    ("River", "Water"),
    ("Sea", "Water"),
    ("City", "Urban place"),
    ("House", "Building"),
    ("School", "Educational building"),
    ("Hospital", "Medical building"),
    ("Park", "Leisure place"),
    ("Cinema", "Entertainment place"),
    ("Restaurant", "Place to eat"),
    ("Winter", "Season"),
    ("Summer", "Season"),
    ("Spring", "Season"),
    ("Autumn", "Season"),
    ("Rain", "Weather"),
    ("Snow", "White"),
];

/// Clue shown to impostors for a secret word
pub fn clue_for(word: &str) -> &'static str {
    CLUES
        .iter()
        .find(|(w, _)| w.eq_ignore_ascii_case(word))
        .map(|(_, clue)| *clue)
        .unwrap_or(NO_CLUE)
}

/// Clusters of words considered semantically close to each other
pub const SEMANTIC_GROUPS: &[&[&str]] = &[
    &["dog", "cat", "pet", "animal", "furry", "paws"],
    &["pizza", "pasta", "italian", "food", "cheese", "oven"],
    &["beach", "sea", "sand", "waves", "summer", "sun", "coast"],
    &["mountain", "peak", "height", "snow", "climbing", "summit"],
    &["car", "auto", "vehicle", "wheels", "engine", "drive"],
    &["plane", "fly", "sky", "airport", "wings", "pilot"],
    &["book", "read", "pages", "story", "author", "novel"],
    &["music", "sound", "song", "melody", "notes", "rhythm"],
    &["football", "ball", "sport", "goal", "team", "stadium"],
    &["computer", "laptop", "keyboard", "screen", "technology", "software"],
    &["coffee", "caffeine", "cup", "drink", "black", "wake"],
    &["chocolate", "cocoa", "sweet", "dessert", "brown", "bar"],
    &["moon", "night", "satellite", "craters", "glow", "full"],
    &["sun", "star", "light", "heat", "day", "yellow"],
    &["tree", "trunk", "leaves", "branches", "forest", "wood"],
    &["flower", "petal", "garden", "scent", "colours", "spring"],
    &["river", "water", "current", "riverbed", "fish", "bridge"],
    &["city", "urban", "buildings", "streets", "people", "traffic"],
    &["house", "home", "dwelling", "roof", "rooms", "family"],
    &["winter", "cold", "snow", "december", "scarf", "ice"],
    &["summer", "heat", "holidays", "beach", "july", "sun"],
    &["spring", "flowers", "april", "rebirth", "colours", "pollen"],
    &["autumn", "leaves", "october", "wind", "harvest", "brown"],
];

/// Words a civilian bot may say for each secret word
const RELATED_WORDS: &[(&str, &[&str])] = &[
    ("Dog", &["Pet", "Bark", "Furry", "Loyal", "Bone", "Collar"]),
    ("Cat", &["Pet", "Meow", "Feline", "Whiskers", "Claws", "Independent"]),
    ("Pizza", &["Italian", "Cheese", "Oven", "Dough", "Sauce", "Slice"]),
    ("Beach", &["Sand", "Sea", "Waves", "Towel", "Umbrella", "Summer"]),
    ("Mountain", &["Peak", "Climbing", "Height", "Snow", "Summit", "Rocks"]),
    ("Car", &["Engine", "Wheels", "Drive", "Petrol", "Steering", "Brakes"]),
    ("Plane", &["Fly", "Wings", "Pilot", "Airport", "Takeoff", "Clouds"]),
    ("Book", &["Read", "Pages", "Author", "Story", "Library", "Chapters"]),
    ("Music", &["Song", "Melody", "Rhythm", "Instrument", "Notes", "Concert"]),
    ("Football", &["Ball", "Goal", "Team", "Stadium", "Referee", "Worldcup"]),
    ("Computer", &["Keyboard", "Screen", "Mouse", "Software", "Internet", "Data"]),
    ("Coffee", &["Caffeine", "Cup", "Morning", "Wake", "Black", "Aroma"]),
    ("Chocolate", &["Cocoa", "Sweet", "Bar", "Brown", "Dessert", "Melt"]),
    ("Moon", &["Night", "Craters", "Satellite", "Full", "Glow", "Astronaut"]),
    ("Sun", &["Star", "Light", "Heat", "Day", "Rays", "Bright"]),
    ("Tree", &["Trunk", "Leaves", "Branches", "Forest", "Wood", "Roots"]),
    ("Flower", &["Petals", "Scent", "Garden", "Colours", "Pollen", "Beauty"]),
    ("River", &["Current", "Water", "Riverbed", "Fish", "Bridge", "Bank"]),
    ("Sea", &["Ocean", "Salt", "Deep", "Waves", "Blue", "Boat"]),
    ("City", &["Buildings", "Streets", "Traffic", "Urban", "Square", "People"]),
    ("House", &["Home", "Roof", "Rooms", "Family", "Door", "Windows"]),
    ("School", &["Classrooms", "Students", "Teacher", "Learn", "Books", "Recess"]),
    ("Hospital", &["Doctors", "Nurses", "Health", "Emergency", "Beds", "Cure"]),
    ("Park", &["Green", "Benches", "Playground", "Nature", "Stroll", "Trees"]),
    ("Cinema", &["Movies", "Screen", "Popcorn", "Seats", "Dark", "Premiere"]),
    ("Restaurant", &["Food", "Menu", "Waiter", "Table", "Dishes", "Dinner"]),
    ("Winter", &["Cold", "Snow", "Scarf", "Ice", "Christmas", "December"]),
    ("Summer", &["Heat", "Holidays", "Beach", "Sun", "July", "Rest"]),
    ("Spring", &["Flowers", "Rebirth", "Colours", "April", "Pollen", "Cheerful"]),
    ("Autumn", &["Leaves", "Falling", "Wind", "October", "Harvest", "Brown"]),
    ("Rain", &["Drops", "Umbrella", "Wet", "Clouds", "Puddles", "Thunder"]),
    ("Snow", &["White", "Cold", "Flakes", "Winter", "Skiing", "Ice"]),
];

/// Used when a secret word has no curated associations
pub const FALLBACK_RELATED: &[&str] = &["Related", "Similar", "Alike"];

pub fn related_words(word: &str) -> &'static [&'static str] {
    RELATED_WORDS
        .iter()
        .find(|(w, _)| w.eq_ignore_ascii_case(word))
        .map(|(_, related)| *related)
        .unwrap_or(FALLBACK_RELATED)
}

/// Clue category → words that hint at belonging to it
pub const CLUE_RELATIONS: &[(&str, &[&str])] = &[
    ("animal", &["dog", "cat", "pet", "furry", "paws", "tail"]),
    ("food", &["pizza", "pasta", "eat", "taste", "dish", "kitchen"]),
    ("place", &["beach", "mountain", "city", "park", "spot"]),
    ("vehicle", &["car", "auto", "wheels", "engine", "drive"]),
    ("technology", &["computer", "laptop", "digital", "electronic"]),
    ("drink", &["coffee", "cup", "liquid", "sip"]),
    ("sweet", &["chocolate", "sugar", "dessert", "candy"]),
    ("celestial", &["moon", "sun", "star", "space", "sky"]),
    ("plant", &["tree", "flower", "green", "leaf", "root"]),
    ("water", &["river", "sea", "ocean", "lake", "liquid"]),
    ("building", &["house", "school", "hospital", "construction"]),
    ("season", &["winter", "summer", "spring", "autumn", "year"]),
    ("weather", &["rain", "snow", "sun", "wind", "storm"]),
];

/// Clue category → safe generic words an impostor can bluff with
pub const CLUE_BLUFFS: &[(&str, &[&str])] = &[
    ("animal", &["Creature", "Living being", "Fauna", "Species", "Specimen"]),
    ("food", &["Dish", "Meal", "Delicious", "Flavour", "Eating"]),
    ("place", &["Spot", "Space", "Zone", "Area", "Destination"]),
    ("vehicle", &["Transport", "Travel", "Moving", "Speed", "Driving"]),
    ("technology", &["Digital", "Electronic", "Modern", "Advanced", "Device"]),
    ("drink", &["Liquid", "Sip", "Refreshing", "Glass", "Thirst"]),
    ("sweet", &["Sugar", "Dessert", "Tasty", "Candy", "Treat"]),
    ("celestial", &["Heavenly", "Sky", "Space", "Shine", "Cosmic"]),
    ("plant", &["Green", "Nature", "Grow", "Vegetable", "Organic"]),
    ("water", &["Liquid", "Damp", "Flow", "Stream", "Clear"]),
    ("building", &["Structure", "Construction", "Venue", "Space", "Indoors"]),
    ("season", &["Period", "Time of year", "Calendar", "Climate", "Change"]),
    ("weather", &["Forecast", "Atmosphere", "Meteorology", "Conditions", "Outside"]),
];

/// Last-resort impostor words when the clue matches no category
pub const GENERIC_FILLERS: &[&str] = &["Thing", "Element", "Object", "Something", "That", "Item"];

/// Themes an impostor without a clue can infer from what others said
pub const THEME_KEYWORDS: &[(&str, &[&str])] = &[
    ("animal", &["pet", "furry", "paws", "tail", "bark", "meow", "animal"]),
    ("food", &["eat", "taste", "dish", "kitchen", "delicious", "food", "meal"]),
    ("place", &["go", "visit", "stay", "spot", "space", "zone", "place"]),
    ("object", &["use", "have", "object", "thing", "item", "element"]),
];

pub const THEME_WORDS: &[(&str, &[&str])] = &[
    ("animal", &["Creature", "Being", "Specimen"]),
    ("food", &["Meal", "Dish", "Flavour"]),
    ("place", &["Spot", "Space", "Zone"]),
    ("object", &["Thing", "Element", "Item"]),
];

pub const VERY_GENERIC: &[&str] = &["Something", "Thing", "That", "Element", "Item", "Object"];

/// Generic terms that give nothing away
pub const VAGUE_WORDS: &[&str] = &[
    "thing", "something", "object", "element", "item", "that", "this", "stuff", "entity",
    "concept", "idea", "good", "bad", "big", "small", "red", "blue",
];
