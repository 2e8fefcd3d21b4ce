//! Deterministic client and company names for demo data.
//!
//! Same RNG stream = same names.

use crate::rng::DemoRng;

pub struct NameGenerator;

impl NameGenerator {
    /// Contact person: first + last name.
    pub fn contact_name(rng: &mut DemoRng) -> String {
        format!("{} {}", rng.pick(FIRST_NAMES), rng.pick(LAST_NAMES))
    }

    /// Trading name: "<Prefix|Surname> <Trade> <Suffix>".
    pub fn company_name(rng: &mut DemoRng) -> String {
        let trade = rng.pick(TRADES);
        let suffix = rng.pick(SUFFIXES);
        if rng.chance(0.5) {
            format!("{} {trade} {suffix}", rng.pick(PREFIXES))
        } else {
            format!("{} {trade} {suffix}", rng.pick(LAST_NAMES))
        }
    }

    /// Mailbox derived from the company name.
    pub fn email_for(company: &str) -> String {
        let slug: String = company
            .split_whitespace()
            .take(2)
            .collect::<Vec<_>>()
            .join(".")
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
            .collect();
        format!("accounts@{slug}.example")
    }

    /// Ten-digit mobile number starting 6-9.
    pub fn phone(rng: &mut DemoRng) -> String {
        let lead = rng.between(6, 9);
        let rest = rng.between(0, 999_999_999);
        format!("{lead}{rest:09}")
    }
}

const FIRST_NAMES: &[&str] = &[
    "Aarav", "Vivaan", "Aditya", "Arjun", "Sai", "Rohan", "Karan", "Vikram", "Rahul", "Nikhil",
    "Ishaan", "Manish", "Suresh", "Ramesh", "Anil", "Deepak", "Harish", "Ravi", "Sanjay", "Naveen",
    "Ananya", "Diya", "Priya", "Kavya", "Sneha", "Pooja", "Meera", "Lakshmi", "Neha", "Divya",
    "Aisha", "Fatima", "Simran", "Harpreet", "Gurpreet", "Shreya", "Nandini", "Asha", "Rekha",
    "Sunita",
];

const LAST_NAMES: &[&str] = &[
    "Sharma", "Verma", "Gupta", "Agarwal", "Mehta", "Shah", "Patel", "Desai", "Joshi", "Kulkarni",
    "Iyer", "Nair", "Menon", "Reddy", "Rao", "Naidu", "Pillai", "Das", "Bose", "Chatterjee",
    "Banerjee", "Mukherjee", "Singh", "Kaur", "Gill", "Malhotra", "Kapoor", "Khanna", "Chopra",
    "Bhatia", "Khan", "Qureshi", "Fernandes", "D'Souza", "Jain", "Bansal", "Goyal", "Mittal",
];

const PREFIXES: &[&str] = &[
    "Shree", "Sai", "Om", "Ganesh", "Lakshmi", "Bharat", "National", "Metro", "Royal", "Supreme",
    "Prime", "Apex", "Sunrise", "Everest", "Coastal", "Deccan",
];

const TRADES: &[&str] = &[
    "Traders", "Textiles", "Steel", "Agro", "Pharma", "Electricals", "Hardware", "Logistics",
    "Builders", "Polymers", "Foods", "Exports", "Motors", "Chemicals", "Paper", "Packaging",
];

const SUFFIXES: &[&str] = &["Pvt Ltd", "LLP", "& Co", "Enterprises", "Industries", "Ltd"];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::DemoStream;

    #[test]
    fn names_are_deterministic() {
        let mut a = DemoRng::new(12345, DemoStream::Clients);
        let mut b = DemoRng::new(12345, DemoStream::Clients);
        assert_eq!(NameGenerator::company_name(&mut a), NameGenerator::company_name(&mut b));
        assert_eq!(NameGenerator::contact_name(&mut a), NameGenerator::contact_name(&mut b));
    }

    #[test]
    fn company_names_have_trade_and_suffix() {
        let mut rng = DemoRng::new(99, DemoStream::Clients);
        for _ in 0..50 {
            let name = NameGenerator::company_name(&mut rng);
            assert!(name.split_whitespace().count() >= 3, "{name}");
        }
    }

    #[test]
    fn email_and_phone_shapes() {
        assert_eq!(
            NameGenerator::email_for("Shree Steel Pvt Ltd"),
            "accounts@shree.steel.example"
        );
        let mut rng = DemoRng::new(3, DemoStream::Clients);
        let phone = NameGenerator::phone(&mut rng);
        assert_eq!(phone.len(), 10);
        assert!(phone.chars().all(|c| c.is_ascii_digit()));
    }
}
