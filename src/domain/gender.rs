// Gender inference from first names, used when a record has no gender field

const MALE_NAMES: &[&str] = &[
    "james", "john", "robert", "michael", "william", "david", "richard", "joseph", "thomas",
    "charles", "christopher", "daniel", "matthew", "anthony", "mark", "donald", "steven", "paul",
    "andrew", "joshua", "kenneth", "kevin", "brian", "george", "timothy", "ronald", "edward",
    "jason", "jeffrey", "ryan", "jacob", "gary", "nicholas", "eric", "jonathan", "stephen",
    "larry", "justin", "scott", "brandon", "benjamin", "samuel", "raymond", "gregory", "frank",
    "alexander", "patrick", "jack", "dennis", "jerry", "tyler", "aaron", "jose", "adam",
    "nathan", "henry", "douglas", "zachary", "peter", "kyle", "noah", "ethan", "jeremy",
    "walter", "christian", "keith", "roger", "terry", "austin", "sean", "gerald", "carl",
    "harold", "dylan", "arthur", "lawrence", "jordan", "jesse", "bryan", "billy", "bruce",
    "gabriel", "joe", "logan", "albert", "willie", "alan", "eugene", "russell", "vincent",
    "philip", "bobby", "johnny", "bradley", "roy", "ralph", "randy", "wayne", "howard",
    "carlos", "victor", "ricky", "luis", "martin", "raj", "amit", "rahul", "vikram", "suresh",
    "rajesh", "vijay", "arun", "sanjay", "kumar", "prakash", "deepak", "vinod", "manoj",
    "ramesh", "mohammed", "ali", "ahmed", "omar", "hassan", "abdullah", "mustafa", "wei",
    "chen", "zhang",
];

const FEMALE_NAMES: &[&str] = &[
    "mary", "patricia", "jennifer", "linda", "elizabeth", "barbara", "susan", "jessica",
    "sarah", "karen", "lisa", "nancy", "betty", "margaret", "sandra", "ashley", "kimberly",
    "emily", "donna", "michelle", "dorothy", "carol", "amanda", "melissa", "deborah",
    "stephanie", "rebecca", "sharon", "laura", "cynthia", "kathleen", "amy", "angela",
    "shirley", "anna", "brenda", "pamela", "emma", "nicole", "helen", "samantha", "katherine",
    "christine", "debra", "rachel", "carolyn", "janet", "catherine", "maria", "heather",
    "diane", "ruth", "julie", "olivia", "joyce", "virginia", "victoria", "kelly", "lauren",
    "christina", "joan", "evelyn", "judith", "megan", "andrea", "cheryl", "hannah",
    "jacqueline", "martha", "gloria", "teresa", "ann", "sara", "madison", "frances", "kathryn",
    "janice", "jean", "abigail", "alice", "julia", "judy", "sophia", "grace", "denise",
    "amber", "doris", "marilyn", "danielle", "beverly", "isabella", "theresa", "diana",
    "natalie", "brittany", "charlotte", "marie", "kayla", "alexis", "priya", "anita", "sunita",
    "pooja", "neha", "anjali", "swati", "kavita", "meena", "rekha", "geeta", "sita", "radha",
    "lakshmi", "fatima", "aisha", "mariam", "mei",
];

const FEMALE_ENDINGS: &[&str] = &["a", "ie", "y", "ine", "elle", "ette", "ia", "ina", "ika"];
const MALE_ENDINGS: &[&str] = &["o", "us", "er", "on", "an", "en", "esh", "aj", "ik"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

fn by_ending(first_name: &str) -> Option<Gender> {
    let matches = |ending: &&str| {
        first_name.ends_with(*ending) && first_name.len() > ending.len() + 1
    };

    if FEMALE_ENDINGS.iter().any(matches) {
        return Some(Gender::Female);
    }
    if MALE_ENDINGS.iter().any(matches) {
        return Some(Gender::Male);
    }
    None
}

/// Guesses a gender from the first word of `full_name`.
///
/// Known names win over suffix patterns. Returns `None` when uncertain.
pub fn detect_gender(full_name: &str) -> Option<Gender> {
    let first_name = full_name.split_whitespace().next()?.to_lowercase();

    if first_name.chars().count() < 2 {
        return None;
    }
    if MALE_NAMES.contains(&first_name.as_str()) {
        return Some(Gender::Male);
    }
    if FEMALE_NAMES.contains(&first_name.as_str()) {
        return Some(Gender::Female);
    }

    by_ending(&first_name)
}
