use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Flavour and texture labels used to search the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum CoffeeTag {
    Strong,
    Bold,
    Rich,
    Velvety,
    Smooth,
    Balanced,
    Light,
    Creamy,
    Sweet,
    Airy,
    Silky,
    Chocolatey,
    Nutty,
    Indulgent,
    Boozy,
    Refreshing,
    LowAcidity,
    Buttery,
    Caffeinated,
    Bright,
    Bitter,
}

impl CoffeeTag {
    pub const ALL: [CoffeeTag; 21] = [
        CoffeeTag::Strong,
        CoffeeTag::Bold,
        CoffeeTag::Rich,
        CoffeeTag::Velvety,
        CoffeeTag::Smooth,
        CoffeeTag::Balanced,
        CoffeeTag::Light,
        CoffeeTag::Creamy,
        CoffeeTag::Sweet,
        CoffeeTag::Airy,
        CoffeeTag::Silky,
        CoffeeTag::Chocolatey,
        CoffeeTag::Nutty,
        CoffeeTag::Indulgent,
        CoffeeTag::Boozy,
        CoffeeTag::Refreshing,
        CoffeeTag::LowAcidity,
        CoffeeTag::Buttery,
        CoffeeTag::Caffeinated,
        CoffeeTag::Bright,
        CoffeeTag::Bitter,
    ];
}

/// A drink on the menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Coffee {
    pub name: String,
    pub summary: String,
    pub tags: Vec<CoffeeTag>,
}

impl Coffee {
    pub fn new(name: impl Into<String>, summary: impl Into<String>, tags: Vec<CoffeeTag>) -> Self {
        Self {
            name: name.into(),
            summary: summary.into(),
            tags,
        }
    }

    /// Whether this coffee carries at least one of `tags`
    pub fn has_any_tag(&self, tags: &[CoffeeTag]) -> bool {
        tags.iter().any(|tag| self.tags.contains(tag))
    }

    /// The full menu of Alex's Coffee, in menu order
    pub fn all() -> Vec<Coffee> {
        MENU.iter()
            .map(|(name, summary, tags)| Coffee::new(*name, *summary, tags.to_vec()))
            .collect()
    }
}

use CoffeeTag::*;

const MENU: &[(&str, &str, &[CoffeeTag])] = &[
    (
        "Espresso",
        "A concentrated shot of coffee extracted under high pressure with no milk; intense, rich, bittersweet flavor with a velvety crema on top.",
        &[Strong, Bold, Rich, Velvety],
    ),
    (
        "Americano",
        "Single shot of espresso diluted with hot water, no milk; smooth, mellow body with subtle acidity and notes of toasted grains.",
        &[Smooth, Balanced, Light],
    ),
    (
        "Ristretto",
        "A 'short' shot of espresso using less water; no milk, offering a sweeter, more concentrated flavor with bright acidity and rich body.",
        &[Strong, Bold, Bright],
    ),
    (
        "Lungo",
        "A 'long' espresso shot extracted with more water; no milk, delivering a more diluted, slightly more bitter profile with deeper caramel notes.",
        &[Bold, Bitter, Rich],
    ),
    (
        "Latte",
        "Single espresso shot topped with steamed whole milk (roughly 2:1 milk-to-espresso) and a thin layer of microfoam; creamy, mild sweetness with gentle coffee aroma.",
        &[Creamy, Sweet, Smooth],
    ),
    (
        "Cappuccino",
        "Equal parts espresso, steamed whole milk, and thick milk foam; balanced, airy texture with pronounced coffee notes and a sweet, creamy finish.",
        &[Creamy, Airy, Balanced],
    ),
    (
        "Flat White",
        "Double espresso shot with steamed whole milk microfoam (about 1:2 milk-to-espresso); silky, velvety mouthfeel with a strong coffee flavor and subtle sweetness.",
        &[Silky, Creamy, Strong],
    ),
    (
        "Macchiato",
        "Single espresso 'stained' with a small dollop of steamed whole milk foam; bold espresso flavor softened by a hint of creamy sweetness.",
        &[Bold, Strong, Creamy],
    ),
    (
        "Cortado",
        "Equal parts espresso and steamed dairy milk with no foam; harmonious, balanced cup with mellow acidity and a smooth, satiny texture.",
        &[Balanced, Smooth, Creamy],
    ),
    (
        "Mocha",
        "Espresso blended with steamed whole milk and chocolate syrup, topped with milk foam; sweet, chocolatey, and richly indulgent with a velvety finish.",
        &[Chocolatey, Sweet, Indulgent, Creamy],
    ),
    (
        "Almond Milk Latte",
        "Espresso shot with steamed almond milk in a 1:3 ratio; nutty, slightly sweet, plant-based creaminess and a lighter, airy body.",
        &[Nutty, Light, Creamy],
    ),
    (
        "Oat Milk Cappuccino",
        "Equal parts espresso, steamed oat milk, and oat-milk foam; smooth, naturally sweet cereal notes with a rich, velvety texture.",
        &[Nutty, Creamy, Sweet, Smooth],
    ),
    (
        "Affogato",
        "Hot shot of espresso poured over a scoop of vanilla gelato (dairy base); contrasts hot and cold, creamy sweetness balanced by robust coffee.",
        &[Sweet, Indulgent, Creamy],
    ),
    (
        "Irish Coffee",
        "Hot brewed coffee mixed with Irish whiskey and brown sugar, topped with lightly whipped heavy cream; warming, boozy, sweet, and luxuriously creamy.",
        &[Boozy, Sweet, Creamy, Rich],
    ),
    (
        "Vienna Coffee",
        "Strong brewed coffee or espresso topped with a dollop of whipped heavy cream instead of milk; rich, smooth mouthfeel with a sweet cream accent.",
        &[Creamy, Sweet, Rich, Velvety],
    ),
    (
        "Cold Brew",
        "Coarse-ground coffee steeped in cold water for 12+ hours, served over ice; no milk, featuring smooth, low-acid profile with chocolatey, nutty notes.",
        &[Smooth, Chocolatey, LowAcidity, Refreshing],
    ),
    (
        "Nitro Cold Brew",
        "Cold brew infused with nitrogen and served on tap; no milk, offering a creamy, cascading texture with subtle sweetness and chocolate undertones.",
        &[Smooth, Velvety, Chocolatey, LowAcidity],
    ),
    (
        "Frappuccino",
        "Blended iced coffee with whole milk and ice, sweetened with flavored syrup and topped with whipped cream; refreshing, sweet, and creamy with customizable flavors.",
        &[Sweet, Creamy, Indulgent, Refreshing],
    ),
    (
        "Bulletproof Coffee",
        "Hot brewed coffee blended with unsalted grass-fed butter and MCT oil (no milk); rich, buttery texture delivering sustained energy and smooth mouthfeel.",
        &[Buttery, Rich, Strong],
    ),
    (
        "Red Eye",
        "Drip-brewed coffee 'hit' with a single shot of espresso, no milk; bold, highly caffeinated, combining drip coffee smoothness with espresso intensity.",
        &[Strong, Bold, Caffeinated],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_menu_has_twenty_unique_coffees() {
        let menu = Coffee::all();
        let names: HashSet<&str> = menu.iter().map(|c| c.name.as_str()).collect();

        assert_eq!(menu.len(), 20);
        assert_eq!(names.len(), 20);
        assert_eq!(menu[0].name, "Espresso");
        assert_eq!(menu[19].name, "Red Eye");
    }

    #[test]
    fn test_tags_serialize_camel_case() {
        assert_eq!(serde_json::to_string(&CoffeeTag::LowAcidity).unwrap(), "\"lowAcidity\"");
        assert_eq!(serde_json::to_string(&CoffeeTag::Sweet).unwrap(), "\"sweet\"");

        let tag: CoffeeTag = serde_json::from_str("\"chocolatey\"").unwrap();
        assert_eq!(tag, CoffeeTag::Chocolatey);
    }

    #[test]
    fn test_every_tag_is_used_on_the_menu() {
        let menu = Coffee::all();
        for tag in CoffeeTag::ALL {
            assert!(menu.iter().any(|c| c.tags.contains(&tag)), "{:?} unused", tag);
        }
    }

    #[test]
    fn test_has_any_tag() {
        let espresso = &Coffee::all()[0];
        assert!(espresso.has_any_tag(&[CoffeeTag::Sweet, CoffeeTag::Bold]));
        assert!(!espresso.has_any_tag(&[CoffeeTag::Sweet, CoffeeTag::Creamy]));
        assert!(!espresso.has_any_tag(&[]));
    }
}
