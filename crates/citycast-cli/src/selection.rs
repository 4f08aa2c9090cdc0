//! Resolving command-line arguments against the saved list.

use citycast_core::AppError;
use citycast_locations::City;

/// Find a saved city by id, by "Name, Country" or by bare name
/// (case-insensitive). A bare name shared by several cities is ambiguous.
pub fn find_city<'a>(cities: &'a [City], query: &str) -> Result<&'a City, AppError> {
    let query = query.trim();

    if let Some(city) = cities.iter().find(|c| c.id == query) {
        return Ok(city);
    }

    if let Some(city) = cities
        .iter()
        .find(|c| c.display_name().eq_ignore_ascii_case(query))
    {
        return Ok(city);
    }

    let by_name: Vec<&City> = cities
        .iter()
        .filter(|c| c.name.eq_ignore_ascii_case(query))
        .collect();

    match by_name.as_slice() {
        [city] => Ok(city),
        [] => Err(AppError::Service(format!(
            "'{}' is not a saved location",
            query
        ))),
        many => {
            let options: Vec<String> = many
                .iter()
                .map(|c| format!("{} [{}]", c.display_name(), c.id))
                .collect();
            Err(AppError::Service(format!(
                "'{}' matches several saved locations: {}",
                query,
                options.join(", ")
            )))
        }
    }
}

/// Turn 1-based positions into a permutation of `0..len`.
pub fn parse_permutation(positions: &[usize], len: usize) -> Result<Vec<usize>, AppError> {
    if positions.len() != len {
        return Err(AppError::Service(format!(
            "Expected {} positions, got {}",
            len,
            positions.len()
        )));
    }

    let mut seen = vec![false; len];
    let mut order = Vec::with_capacity(len);
    for &position in positions {
        if position == 0 || position > len {
            return Err(AppError::Service(format!(
                "Position {} is out of range 1..={}",
                position, len
            )));
        }
        let index = position - 1;
        if seen[index] {
            return Err(AppError::Service(format!(
                "Position {} appears more than once",
                position
            )));
        }
        seen[index] = true;
        order.push(index);
    }

    Ok(order)
}

/// Pick the `pick`-th (1-based) geocoding candidate
pub fn pick_candidate(candidates: Vec<City>, pick: usize, query: &str) -> Result<City, AppError> {
    let count = candidates.len();
    if count == 0 {
        return Err(AppError::Service(format!("No cities found for '{}'", query)));
    }
    let out_of_range = || {
        AppError::Service(format!(
            "--pick {} is out of range; '{}' has {} candidate(s)",
            pick, query, count
        ))
    };
    if pick == 0 {
        return Err(out_of_range());
    }
    candidates.into_iter().nth(pick - 1).ok_or_else(out_of_range)
}
