use crate::types::Location;

/// Cities offered by the route planner, with the coordinates used as trip
/// endpoints.
pub const CITIES: &[(&str, Location)] = &[
    ("Lisboa", Location::new(38.7169, -9.1399)),
    ("Porto", Location::new(41.1496, -8.6109)),
    ("Coimbra", Location::new(40.2056, -8.4196)),
    ("Viseu", Location::new(40.661, -7.9097)),
    ("Braga", Location::new(41.5454, -8.4265)),
    ("Aveiro", Location::new(40.6405, -8.6538)),
    ("Leiria", Location::new(39.7495, -8.8077)),
    ("Faro", Location::new(37.0194, -7.9304)),
    ("Évora", Location::new(38.5713, -7.9136)),
    ("Beja", Location::new(38.0141, -7.8632)),
    ("Castelo Branco", Location::new(39.8222, -7.4918)),
    ("Vila Real", Location::new(41.3006, -7.7441)),
    ("Bragança", Location::new(41.8062, -6.7567)),
    ("Guarda", Location::new(40.5373, -7.2677)),
    ("Portalegre", Location::new(39.2967, -7.4286)),
    ("Santarém", Location::new(39.2362, -8.6855)),
    ("Setúbal", Location::new(38.5244, -8.8882)),
    ("Viana do Castelo", Location::new(41.6932, -8.8329)),
];

// Primary collation key: accents and case dropped.
fn fold(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
            'ç' | 'Ç' => 'c',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

pub fn lookup(name: &str) -> Option<Location> {
    let name = name.trim();
    CITIES
        .iter()
        .find(|(city, _)| *city == name)
        .or_else(|| {
            let folded = fold(name);
            CITIES.iter().find(|(city, _)| fold(city) == folded)
        })
        .map(|(_, location)| *location)
}

/// City names in the order a Portuguese-locale select box shows them.
pub fn city_names_sorted() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = CITIES.iter().map(|(name, _)| *name).collect();
    names.sort_by(|a, b| fold(a).cmp(&fold(b)).then_with(|| a.cmp(b)));
    names
}
