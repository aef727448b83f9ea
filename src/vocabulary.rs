//! Keyword vocabularies shared by the request path and offline tooling
//!
//! The lists are data the spam model was fit against. Entries, duplicates
//! and typography (curly apostrophes included) are kept exactly as the
//! model saw them; editing a list changes the feature contract.

use serde::{Deserialize, Serialize};

/// Financial scam, phishing, urgency, illegal product and spam phrases.
pub const SPAM_KEYWORDS: &[&str] = &[
    // financial offers
    "cash", "free", "prize", "winning", "congratulations", "claim", "bonus", "money",
    "offer", "pay", "investment", "earnings", "discount", "credit card", "no cost",
    "payday loan", "save money", "get rich", "lottery", "winner", "payment", "guarantee",
    "risk-free", "bank account", "deposit", "withdraw", "refund", "fund transfer",
    "deposit now", "instant win", "cash prize",
    // dubious links
    "click here", "visit our website", "you won\u{2019}t believe", "just for you", "act now",
    "now or never", "limited time offer", "call now", "don't miss out", "urgent",
    "hurry", "immediate action required", "attention", "final notice", "unsolicited offer",
    "no obligation",
    // illegal products
    "viagra", "cialis", "prescription drugs", "weight loss", "herbal pills", "pharmacy",
    "enhancement", "medical treatment", "fast results", "fake watches", "fake merchandise",
    "counterfeit", "replica", "online pharmacy", "bodybuilding", "diet pills", "natural remedies",
    // investment and crypto
    "bitcoin", "cryptocurrency", "ethereum", "altcoin", "ico", "investment opportunity",
    "trade now", "financial freedom", "secure your future", "diversify your portfolio",
    "multi-level marketing", "pyramid scheme", "ponzi scheme", "passive income",
    // phishing
    "account verification", "login", "reset password", "suspicious activity", "please verify",
    "your account is suspended", "account update", "login immediately", "confirm your details",
    "immediate action required", "verify now", "suspended account",
    // stock spam phrases
    "make money fast", "earn money online", "work from home", "easy money", "no strings attached",
    "no hidden fees", "you\u{2019}ve been selected", "don't miss out", "act fast", "call now for a free trial",
    "free gift", "unclaimed prize", "you've been approved", "immediate response needed",
    // travel
    "vacation", "trip", "free holiday", "getaway", "resort", "free flight", "discounted hotels",
    "luxury vacation", "trip of a lifetime", "vacation package", "last minute deal", "travel offer",
    "special offer",
    // misc
    "adult", "porn", "gambling", "adult content", "spam", "fake", "unsubscribe", "malware",
    "virus", "download", "trojan", "phishing", "risky download",
];

/// Promotional marketing phrases.
pub const PROMO_WORDS: &[&str] = &[
    // offers
    "offer", "discount", "sale", "deal", "coupon", "voucher", "free", "save",
    "promo", "limited time", "special offer", "clearance", "exclusive", "bargain",
    "bundle", "flash sale", "buy one get one", "free shipping", "exclusive deal",
    "unbeatable price", "offer expires", "today only", "final sale", "price drop",
    "price cut", "special discount", "best deal", "end of season sale", "mega sale",
    "big savings", "limited time offer", "save up to", "super sale", "hot deal",
    // products
    "free trial", "buy now", "get started", "limited stock", "hot item", "best seller",
    "new release", "must-have", "featured product", "limited edition", "exclusive product",
    "top rated", "limited quantity", "best value", "new arrival", "just for you",
    "special price", "limited time deal", "seasonal offer", "hot pick", "high demand",
    // perks
    "bonus", "gift", "reward", "thank you gift", "free gift", "surprise gift",
    "gift card", "loyalty program", "rewards", "exclusive access", "premium access",
    "early bird", "VIP", "gold member", "bronze member", "platinum member", "premium",
    "complimentary", "members only", "priority access", "personalized", "extra benefits",
    // calls to action
    "buy now", "shop now", "get yours", "order now", "claim your", "sign up", "subscribe now",
    "join now", "click here", "act fast", "get yours today", "register now", "grab it now",
    "don\u{2019}t miss out", "get started", "limited offer", "click to claim", "add to cart",
    "hurry", "now or never", "act quickly", "exclusive access", "get your discount",
    // urgency
    "hurry", "limited time", "last chance", "ending soon", "only a few left", "only today",
    "expiring soon", "ending today", "time is running out", "closing soon", "don\u{2019}t wait",
    "act fast", "rush", "quick", "now", "only hours left", "final hours", "only minutes left",
    // markdowns
    "clearance sale", "blowout sale", "half price", "discounted", "price drop", "half off",
    "flash sale", "buy one get one free", "limited time discount", "save big", "final markdown",
    "hot deal", "massive discount", "special deal", "unbeatable price", "low price",
    "huge savings", "lowest price", "cut prices", "discounts available", "bulk discount",
    "price slash", "mega savings", "one-time offer", "special savings", "today\u{2019}s deal",
    // shipping
    "free shipping", "free delivery", "fast shipping", "same day delivery", "expedited shipping",
    "next day delivery", "international shipping", "worldwide shipping", "free return",
    "satisfaction guaranteed", "no hidden fees", "easy returns", "return policy", "free return shipping",
    // seasonal
    "Black Friday", "Cyber Monday", "Christmas Sale", "New Year Sale", "Holiday Discount",
    "Summer Sale", "Spring Offer", "Back to School Sale", "End of Year Sale", "Seasonal Sale",
    "Big Sale", "Weekend Special", "Flash Discount", "Holiday Shopping", "Easter Sale",
    "Fall Offer", "Thanksgiving Deal", "Boxing Day Sale", "Valentine\u{2019}s Day Sale",
];

/// Pronouns counted by the offline feature set.
pub const PRONOUNS: &[&str] = &[
    // subject
    "I", "you", "he", "she", "it", "we", "they",
    // object
    "me", "you", "him", "her", "it", "us", "them",
    // possessive
    "my", "your", "his", "her", "its", "our", "their",
    // reflexive
    "myself", "yourself", "himself", "herself", "itself", "ourselves", "yourselves", "themselves",
    // demonstrative
    "this", "that", "these", "those",
    // indefinite
    "everyone", "someone", "anyone", "no one", "nothing", "everything", "anything", "everybody",
    "somebody", "anybody", "nobody",
    // interrogative
    "who", "whom", "whose", "which", "what",
    // relative
    "who", "whom", "whose", "which", "that",
];

/// English stopwords dropped from `cleaned_message`, matching the model's
/// training data. "free", "click", "won", "best", "order", "work" and
/// "home" are not stopwords here.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all",
    "almost", "alone", "along", "already", "also", "although", "always", "am", "among",
    "amongst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything",
    "anyway", "anywhere", "are", "around", "as", "at",
    "back", "be", "became", "because", "become", "becomes", "becoming", "been", "before",
    "beforehand", "behind", "being", "below", "beside", "besides", "between", "beyond",
    "both", "bottom", "but", "by",
    "call", "can", "cannot", "ca", "could",
    "did", "do", "does", "doing", "done", "down", "due", "during",
    "each", "eight", "either", "eleven", "else", "elsewhere", "empty", "enough", "even",
    "ever", "every", "everyone", "everything", "everywhere", "except",
    "few", "fifteen", "fifty", "first", "five", "for", "former", "formerly", "forty",
    "four", "from", "front", "full", "further",
    "get", "give", "go",
    "had", "has", "have", "he", "hence", "her", "here", "hereafter", "hereby", "herein",
    "hereupon", "hers", "herself", "him", "himself", "his", "how", "however", "hundred",
    "i", "if", "in", "indeed", "into", "is", "it", "its", "itself",
    "just",
    "keep",
    "last", "latter", "latterly", "least", "less",
    "made", "make", "many", "may", "me", "meanwhile", "might", "mine", "more", "moreover",
    "most", "mostly", "move", "much", "must", "my", "myself",
    "name", "namely", "neither", "never", "nevertheless", "next", "nine", "no", "nobody",
    "none", "noone", "nor", "not", "nothing", "now", "nowhere",
    "of", "off", "often", "on", "once", "one", "only", "onto", "or", "other", "others",
    "otherwise", "our", "ours", "ourselves", "out", "over", "own",
    "part", "per", "perhaps", "please", "put",
    "quite",
    "rather", "re", "really", "regarding",
    "same", "say", "see", "seem", "seemed", "seeming", "seems", "serious", "several", "she",
    "should", "show", "side", "since", "six", "sixty", "so", "some", "somehow", "someone",
    "something", "sometime", "sometimes", "somewhere", "still", "such",
    "take", "ten", "than", "that", "the", "their", "them", "themselves", "then", "thence",
    "there", "thereafter", "thereby", "therefore", "therein", "thereupon", "these", "they",
    "third", "this", "those", "though", "three", "through", "throughout", "thru", "thus",
    "to", "together", "too", "top", "toward", "towards", "twelve", "twenty", "two",
    "under", "until", "up", "unless", "upon", "us", "used", "using",
    "various", "very", "via",
    "was", "we", "well", "were", "what", "whatever", "when", "whence", "whenever", "where",
    "whereafter", "whereas", "whereby", "wherein", "whereupon", "wherever", "whether",
    "which", "while", "whither", "who", "whoever", "whole", "whom", "whose", "why", "will",
    "with", "within", "without", "would",
    "yet", "you", "your", "yours", "yourself", "yourselves",
    // contraction tails
    "'d", "'ll", "'m", "'re", "'s", "'ve", "n't",
];

/// Which list feeds `promo_word_count` / `promo_word_ratio`.
///
/// The deployed spam model was fit with both promo columns computed from the
/// spam list, so `Spam` is the default. `Promotional` is for a model trained
/// on the promotional list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromoVocabulary {
    /// Reuse the spam list (matches the deployed model)
    #[default]
    Spam,
    /// Use `PROMO_WORDS`
    Promotional,
}

impl PromoVocabulary {
    /// Phrase list backing this choice
    #[must_use]
    pub const fn phrases(self) -> &'static [&'static str] {
        match self {
            Self::Spam => SPAM_KEYWORDS,
            Self::Promotional => PROMO_WORDS,
        }
    }
}

/// A closed phrase set with substring-membership counting.
#[derive(Debug, Clone)]
pub struct FeatureVocabulary {
    phrases: Vec<String>,
}

impl FeatureVocabulary {
    /// Build from a phrase list, lowercasing every entry.
    #[must_use]
    pub fn new(phrases: &[&str]) -> Self {
        Self {
            phrases: phrases.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// The spam-signal vocabulary
    #[must_use]
    pub fn spam() -> Self {
        Self::new(SPAM_KEYWORDS)
    }

    /// The promotional vocabulary
    #[must_use]
    pub fn promotional() -> Self {
        Self::new(PROMO_WORDS)
    }

    /// The pronoun list used offline
    #[must_use]
    pub fn pronouns() -> Self {
        Self::new(PRONOUNS)
    }

    /// Number of entries, duplicates included
    #[must_use]
    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    /// True for an empty list
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Number of entries that occur anywhere in `text`, case-insensitively.
    ///
    /// Each entry counts at most once no matter how often it occurs, while a
    /// duplicated entry counts once per copy. Matching is plain substring
    /// containment, so "free" also hits "freedom".
    #[must_use]
    pub fn count_in(&self, text: &str) -> usize {
        let haystack = text.to_lowercase();
        self.phrases
            .iter()
            .filter(|phrase| haystack.contains(phrase.as_str()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_are_kept() {
        let spam = FeatureVocabulary::spam();
        assert_eq!(spam.len(), SPAM_KEYWORDS.len());
        assert_eq!(
            spam.count_in("immediate action required"),
            2,
            "listed twice, counted twice"
        );
    }

    #[test]
    fn test_membership_not_frequency() {
        let spam = FeatureVocabulary::spam();
        assert_eq!(spam.count_in("cash"), 1);
        assert_eq!(spam.count_in("cash cash cash"), 1);
    }

    #[test]
    fn test_substring_hits() {
        let spam = FeatureVocabulary::spam();
        assert_eq!(spam.count_in("freedom"), 1);
    }

    #[test]
    fn test_capitalized_promo_entries_match() {
        let promo = FeatureVocabulary::promotional();
        assert!(promo.count_in("huge black friday blowout") >= 1);
    }

    #[test]
    fn test_curly_apostrophes_preserved() {
        let spam = FeatureVocabulary::spam();
        assert_eq!(spam.count_in("you won\u{2019}t believe"), 1);
        assert_eq!(spam.count_in("you won't believe"), 0);
    }

    #[test]
    fn test_stop_words_leave_spam_signals_alone() {
        for word in ["free", "click", "won", "best", "order", "work", "home", "cash", "win"] {
            assert!(!STOP_WORDS.contains(&word), "{word} must survive cleaning");
        }
        for word in ["the", "your", "here", "for", "now", "n't"] {
            assert!(STOP_WORDS.contains(&word), "{word} should be a stopword");
        }
    }

    #[test]
    fn test_default_promo_vocabulary_is_spam_list() {
        assert_eq!(PromoVocabulary::default(), PromoVocabulary::Spam);
        assert_eq!(PromoVocabulary::default().phrases().len(), SPAM_KEYWORDS.len());
    }
}
