//! Crafting and smelting recipes as the client sees them.
//!
//! ```text
//! [string id][string type] then, by type:
//!   crafting_shaped    [varint width][varint height][ingredient × w·h][result]
//!   crafting_shapeless [varint count][ingredient × count][result]
//!   smelting           [ingredient][result][f32 experience][varint cooking time]
//! ingredient:          [varint n][item stack × n]
//! ```

use cinder_buffer::ByteBuffer;

use crate::codec::write_len;
use crate::types::{ItemStackSerializer, ValueSerializer};
use crate::values::ItemStack;
use crate::{CodecContext, ProtocolError};

const SHAPED: &str = "crafting_shaped";
const SHAPELESS: &str = "crafting_shapeless";
const SMELTING: &str = "smelting";

/// Widest or tallest shaped recipe accepted from the wire.
pub const MAX_RECIPE_SIDE: usize = 16;

// ---------------------------------------------------------------------------
// Ingredient
// ---------------------------------------------------------------------------

/// A set of acceptable stacks. Any one of them satisfies the slot; an
/// empty set is an empty slot in a shaped pattern.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ingredient {
    pub options: Vec<ItemStack>,
}

impl Ingredient {
    pub fn new(options: Vec<ItemStack>) -> Self {
        Self { options }
    }

    /// Matches exactly one item type.
    pub fn of(item: impl Into<String>) -> Self {
        Self::new(vec![ItemStack::new(item, 1)])
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Whether `slot` satisfies this ingredient. Only the item type is
    /// compared.
    pub fn test(&self, slot: Option<&ItemStack>) -> bool {
        match slot.filter(|stack| !stack.is_empty()) {
            None => self.is_empty(),
            Some(stack) => self.options.iter().any(|option| option.item == stack.item),
        }
    }

    fn write(&self, ctx: &CodecContext<'_>, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        if let Some(option) = self.options.iter().find(|option| option.is_empty()) {
            return Err(ProtocolError::Unencodable(format!(
                "ingredient option {} has no items",
                option.item
            )));
        }
        write_len(buf, self.options.len())?;
        for option in &self.options {
            ItemStackSerializer.write(ctx, buf, &Some(option.clone()))?;
        }
        Ok(())
    }

    fn read(ctx: &CodecContext<'_>, buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        let count = buf.read_length()?;
        let mut options = Vec::with_capacity(count);
        for _ in 0..count {
            let stack = ItemStackSerializer.read(ctx, buf)?.ok_or_else(|| {
                ProtocolError::InvalidMessage("empty stack inside an ingredient".into())
            })?;
            options.push(stack);
        }
        Ok(Self { options })
    }
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ShapedRecipe {
    pub id: String,
    pub width: usize,
    pub height: usize,
    /// Row-major, `width × height` long.
    pub ingredients: Vec<Ingredient>,
    pub result: ItemStack,
}

impl ShapedRecipe {
    pub fn new(
        id: impl Into<String>,
        width: usize,
        height: usize,
        ingredients: Vec<Ingredient>,
        result: ItemStack,
    ) -> Result<Self, ProtocolError> {
        if !valid_shape(width, height, ingredients.len()) {
            return Err(ProtocolError::InvalidMessage(format!(
                "shaped recipe is {width}x{height} but has {} ingredients",
                ingredients.len()
            )));
        }
        Ok(Self {
            id: id.into(),
            width,
            height,
            ingredients,
            result,
        })
    }

    /// The ingredient at column `x`, row `y`, if that cell exists.
    pub fn ingredient(&self, x: usize, y: usize) -> Option<&Ingredient> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.ingredients.get(y * self.width + x)
    }

    fn matches_at(&self, grid: &CraftingGrid, dx: usize, dy: usize) -> bool {
        (0..grid.height).all(|gy| {
            (0..grid.width).all(|gx| {
                let slot = grid.get(gx, gy);
                let inside = gx >= dx && gx < dx + self.width && gy >= dy && gy < dy + self.height;
                if inside {
                    self.ingredient(gx - dx, gy - dy)
                        .is_some_and(|ingredient| ingredient.test(slot))
                } else {
                    slot.is_none()
                }
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapelessRecipe {
    pub id: String,
    pub ingredients: Vec<Ingredient>,
    pub result: ItemStack,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmeltingRecipe {
    pub id: String,
    pub ingredient: Ingredient,
    pub result: ItemStack,
    pub experience: f32,
    pub cooking_time: i32,
}

/// A recipe the client can display in its recipe book.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkRecipe {
    Shaped(ShapedRecipe),
    Shapeless(ShapelessRecipe),
    Smelting(SmeltingRecipe),
}

impl NetworkRecipe {
    pub fn id(&self) -> &str {
        match self {
            Self::Shaped(r) => &r.id,
            Self::Shapeless(r) => &r.id,
            Self::Smelting(r) => &r.id,
        }
    }

    pub fn result(&self) -> &ItemStack {
        match self {
            Self::Shaped(r) => &r.result,
            Self::Shapeless(r) => &r.result,
            Self::Smelting(r) => &r.result,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Shaped(_) => SHAPED,
            Self::Shapeless(_) => SHAPELESS,
            Self::Smelting(_) => SMELTING,
        }
    }

    /// Whether the grid's contents satisfy this recipe.
    ///
    /// Shaped recipes may sit at any offset as long as every cell around
    /// them is empty. Shapeless recipes match the non-empty cells as a
    /// multiset. Smelting recipes match a grid holding exactly one stack.
    pub fn matches(&self, grid: &CraftingGrid) -> bool {
        match self {
            Self::Shaped(recipe) => {
                if recipe.width > grid.width || recipe.height > grid.height {
                    return false;
                }
                (0..=grid.height - recipe.height).any(|dy| {
                    (0..=grid.width - recipe.width).any(|dx| recipe.matches_at(grid, dx, dy))
                })
            }
            Self::Shapeless(recipe) => {
                let stacks: Vec<&ItemStack> = grid.stacks().collect();
                stacks.len() == recipe.ingredients.len()
                    && assign(&recipe.ingredients, &stacks, &mut vec![false; stacks.len()])
            }
            Self::Smelting(recipe) => {
                let mut stacks = grid.stacks();
                match (stacks.next(), stacks.next()) {
                    (Some(stack), None) => recipe.ingredient.test(Some(stack)),
                    _ => false,
                }
            }
        }
    }

    pub fn write(&self, ctx: &CodecContext<'_>, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        if self.result().is_empty() {
            return Err(ProtocolError::Unencodable(format!(
                "recipe {} has an empty result",
                self.id()
            )));
        }
        if let Self::Shaped(recipe) = self {
            if !valid_shape(recipe.width, recipe.height, recipe.ingredients.len()) {
                return Err(ProtocolError::Unencodable(format!(
                    "shaped recipe {} is {}x{} with {} ingredients",
                    recipe.id,
                    recipe.width,
                    recipe.height,
                    recipe.ingredients.len()
                )));
            }
        }
        buf.write_string(self.id())?;
        buf.write_string(self.type_name())?;
        match self {
            Self::Shaped(recipe) => {
                write_len(buf, recipe.width)?;
                write_len(buf, recipe.height)?;
                for ingredient in &recipe.ingredients {
                    ingredient.write(ctx, buf)?;
                }
            }
            Self::Shapeless(recipe) => {
                write_len(buf, recipe.ingredients.len())?;
                for ingredient in &recipe.ingredients {
                    ingredient.write(ctx, buf)?;
                }
            }
            Self::Smelting(recipe) => recipe.ingredient.write(ctx, buf)?,
        }
        ItemStackSerializer.write(ctx, buf, &Some(self.result().clone()))?;
        if let Self::Smelting(recipe) = self {
            buf.write_f32(recipe.experience)?;
            buf.write_var_int(recipe.cooking_time)?;
        }
        Ok(())
    }

    pub fn read(ctx: &CodecContext<'_>, buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        let id = buf.read_string()?;
        let kind = buf.read_string()?;
        match kind.as_str() {
            SHAPED => {
                let width = read_side(buf)?;
                let height = read_side(buf)?;
                let cells = width * height;
                // Each ingredient is at least one byte.
                if cells > buf.readable_bytes() {
                    return Err(ProtocolError::InvalidMessage(format!(
                        "shaped recipe {id} claims {cells} ingredients"
                    )));
                }
                let ingredients = (0..cells)
                    .map(|_| Ingredient::read(ctx, buf))
                    .collect::<Result<Vec<_>, _>>()?;
                let result = read_result(ctx, buf)?;
                ShapedRecipe::new(id, width, height, ingredients, result).map(Self::Shaped)
            }
            SHAPELESS => {
                let count = buf.read_length()?;
                let ingredients = (0..count)
                    .map(|_| Ingredient::read(ctx, buf))
                    .collect::<Result<Vec<_>, _>>()?;
                let result = read_result(ctx, buf)?;
                Ok(Self::Shapeless(ShapelessRecipe {
                    id,
                    ingredients,
                    result,
                }))
            }
            SMELTING => {
                let ingredient = Ingredient::read(ctx, buf)?;
                let result = read_result(ctx, buf)?;
                let experience = buf.read_f32()?;
                let cooking_time = buf.read_var_int()?;
                Ok(Self::Smelting(SmeltingRecipe {
                    id,
                    ingredient,
                    result,
                    experience,
                    cooking_time,
                }))
            }
            other => Err(ProtocolError::InvalidMessage(format!(
                "unknown recipe type {other:?}"
            ))),
        }
    }
}

fn valid_shape(width: usize, height: usize, cells: usize) -> bool {
    let side = 1..=MAX_RECIPE_SIDE;
    side.contains(&width) && side.contains(&height) && width * height == cells
}

fn read_side(buf: &mut ByteBuffer) -> Result<usize, ProtocolError> {
    let side = buf.read_var_int()?;
    match usize::try_from(side) {
        Ok(side) if (1..=MAX_RECIPE_SIDE).contains(&side) => Ok(side),
        _ => Err(ProtocolError::InvalidMessage(format!(
            "shaped recipe side of {side}"
        ))),
    }
}

fn read_result(ctx: &CodecContext<'_>, buf: &mut ByteBuffer) -> Result<ItemStack, ProtocolError> {
    ItemStackSerializer
        .read(ctx, buf)?
        .ok_or_else(|| ProtocolError::InvalidMessage("recipe has no result".into()))
}

/// Backtracking bipartite match of ingredients onto stacks.
fn assign(ingredients: &[Ingredient], stacks: &[&ItemStack], used: &mut [bool]) -> bool {
    let Some((first, rest)) = ingredients.split_first() else {
        return true;
    };
    for (idx, stack) in stacks.iter().enumerate() {
        if used[idx] || !first.test(Some(stack)) {
            continue;
        }
        used[idx] = true;
        if assign(rest, stacks, used) {
            return true;
        }
        used[idx] = false;
    }
    false
}

// ---------------------------------------------------------------------------
// Crafting grid
// ---------------------------------------------------------------------------

/// Row-major crafting grid contents.
#[derive(Debug, Clone, PartialEq)]
pub struct CraftingGrid {
    width: usize,
    height: usize,
    slots: Vec<Option<ItemStack>>,
}

impl CraftingGrid {
    /// An empty grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            slots: vec![None; width * height],
        }
    }

    /// A grid from row-major slots. `None` if the length is wrong.
    pub fn from_slots(width: usize, height: usize, slots: Vec<Option<ItemStack>>) -> Option<Self> {
        (slots.len() == width * height).then_some(Self {
            width,
            height,
            slots,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// The stack at `(x, y)`. Empty stacks read as `None`.
    pub fn get(&self, x: usize, y: usize) -> Option<&ItemStack> {
        self.slots
            .get(y * self.width + x)
            .and_then(Option::as_ref)
            .filter(|stack| !stack.is_empty())
    }

    pub fn set(&mut self, x: usize, y: usize, stack: Option<ItemStack>) {
        if x < self.width && y < self.height {
            self.slots[y * self.width + x] = stack;
        }
    }

    fn stacks(&self) -> impl Iterator<Item = &ItemStack> {
        self.slots
            .iter()
            .filter_map(Option::as_ref)
            .filter(|stack| !stack.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProtocolRegistries;

    fn stack(item: &str) -> ItemStack {
        ItemStack::new(format!("minecraft:{item}"), 1)
    }

    fn ing(item: &str) -> Ingredient {
        Ingredient::of(format!("minecraft:{item}"))
    }

    fn grid(width: usize, height: usize, cells: &[Option<&str>]) -> CraftingGrid {
        let slots = cells.iter().map(|cell| cell.map(stack)).collect();
        CraftingGrid::from_slots(width, height, slots).unwrap()
    }

    fn sticks() -> NetworkRecipe {
        NetworkRecipe::Shaped(
            ShapedRecipe::new(
                "minecraft:stick",
                1,
                2,
                vec![ing("planks"), ing("planks")],
                ItemStack::new("minecraft:stick", 4),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_shaped_dimensions_validated() {
        let err = ShapedRecipe::new("x", 2, 2, vec![ing("stone")], stack("stone")).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessage(_)));
    }

    #[test]
    fn test_shaped_side_limit_matches_decoder() {
        let side = MAX_RECIPE_SIDE + 1;
        let ingredients = vec![Ingredient::empty(); side];
        let err = ShapedRecipe::new("x", side, 1, ingredients, stack("stone")).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessage(_)));
    }

    #[test]
    fn test_ingredient_lookup_out_of_range() {
        let NetworkRecipe::Shaped(recipe) = sticks() else {
            unreachable!()
        };
        assert_eq!(recipe.ingredient(0, 1), Some(&ing("planks")));
        assert_eq!(recipe.ingredient(1, 0), None);
        assert_eq!(recipe.ingredient(0, 2), None);
    }

    #[test]
    fn test_shaped_matches_at_any_offset() {
        let recipe = sticks();
        let top_left = grid(3, 3, &[
            Some("planks"), None, None,
            Some("planks"), None, None,
            None, None, None,
        ]);
        let bottom_right = grid(3, 3, &[
            None, None, None,
            None, None, Some("planks"),
            None, None, Some("planks"),
        ]);
        assert!(recipe.matches(&top_left));
        assert!(recipe.matches(&bottom_right));
    }

    #[test]
    fn test_shaped_rejects_stray_items() {
        let recipe = sticks();
        let stray = grid(3, 3, &[
            Some("planks"), None, None,
            Some("planks"), None, None,
            None, None, Some("dirt"),
        ]);
        assert!(!recipe.matches(&stray));
        assert!(!recipe.matches(&grid(1, 1, &[Some("planks")])));
    }

    #[test]
    fn test_shaped_is_row_major() {
        let recipe = NetworkRecipe::Shaped(
            ShapedRecipe::new(
                "x",
                2,
                1,
                vec![ing("stone"), ing("dirt")],
                stack("cobblestone"),
            )
            .unwrap(),
        );
        assert!(recipe.matches(&grid(2, 1, &[Some("stone"), Some("dirt")])));
        assert!(!recipe.matches(&grid(2, 1, &[Some("dirt"), Some("stone")])));
    }

    #[test]
    fn test_ingredient_is_logical_or() {
        let either = Ingredient::new(vec![stack("coal"), stack("planks")]);
        assert!(either.test(Some(&stack("coal"))));
        assert!(either.test(Some(&stack("planks"))));
        assert!(!either.test(Some(&stack("dirt"))));
        assert!(!either.test(None));
        assert!(Ingredient::empty().test(None));
    }

    #[test]
    fn test_shapeless_matches_as_multiset() {
        let recipe = NetworkRecipe::Shapeless(ShapelessRecipe {
            id: "x".into(),
            ingredients: vec![
                Ingredient::new(vec![stack("coal"), stack("diamond")]),
                ing("coal"),
            ],
            result: stack("torch"),
        });
        assert!(recipe.matches(&grid(2, 2, &[None, Some("coal"), Some("diamond"), None])));
        // The greedy choice (coal for the first slot) must be undone.
        assert!(recipe.matches(&grid(2, 2, &[Some("coal"), None, None, Some("diamond")])));
        assert!(!recipe.matches(&grid(2, 2, &[Some("diamond"), Some("diamond"), None, None])));
        assert!(!recipe.matches(&grid(2, 2, &[Some("coal"), None, None, None])));
    }

    #[test]
    fn test_smelting_needs_exactly_one_stack() {
        let recipe = NetworkRecipe::Smelting(SmeltingRecipe {
            id: "x".into(),
            ingredient: ing("iron_ore"),
            result: stack("iron_ingot"),
            experience: 0.7,
            cooking_time: 200,
        });
        assert!(recipe.matches(&grid(1, 1, &[Some("iron_ore")])));
        assert!(!recipe.matches(&grid(2, 1, &[Some("iron_ore"), Some("iron_ore")])));
    }

    #[test]
    fn test_wire_round_trip_for_each_type() {
        let registries = ProtocolRegistries::builtin().unwrap();
        let ctx = CodecContext::default_locale(&registries);
        let recipes = [
            sticks(),
            NetworkRecipe::Shapeless(ShapelessRecipe {
                id: "minecraft:bread".into(),
                ingredients: vec![ing("wheat"), ing("wheat"), ing("wheat")],
                result: stack("bread"),
            }),
            NetworkRecipe::Smelting(SmeltingRecipe {
                id: "minecraft:iron_ingot".into(),
                ingredient: ing("iron_ore"),
                result: stack("iron_ingot"),
                experience: 0.7,
                cooking_time: 200,
            }),
        ];
        for recipe in recipes {
            let mut buf = ByteBuffer::new();
            recipe.write(&ctx, &mut buf).unwrap();
            assert_eq!(NetworkRecipe::read(&ctx, &mut buf).unwrap(), recipe);
            assert!(!buf.is_readable());
        }
    }

    #[test]
    fn test_zero_quantity_stacks_are_unencodable() {
        let registries = ProtocolRegistries::builtin().unwrap();
        let ctx = CodecContext::default_locale(&registries);
        let empty_option = NetworkRecipe::Shaped(
            ShapedRecipe::new(
                "x",
                1,
                1,
                vec![Ingredient::new(vec![ItemStack::new("minecraft:stone", 0)])],
                stack("cobblestone"),
            )
            .unwrap(),
        );
        let empty_result = NetworkRecipe::Smelting(SmeltingRecipe {
            id: "x".into(),
            ingredient: ing("iron_ore"),
            result: ItemStack::new("minecraft:iron_ingot", 0),
            experience: 0.7,
            cooking_time: 200,
        });
        for recipe in [empty_option, empty_result] {
            let mut buf = ByteBuffer::new();
            let err = recipe.write(&ctx, &mut buf).unwrap_err();
            assert!(matches!(err, ProtocolError::Unencodable(_)));
        }
    }

    #[test]
    fn test_malformed_shaped_fields_are_unencodable() {
        let registries = ProtocolRegistries::builtin().unwrap();
        let ctx = CodecContext::default_locale(&registries);
        let recipe = NetworkRecipe::Shaped(ShapedRecipe {
            id: "x".into(),
            width: 2,
            height: 2,
            ingredients: vec![ing("stone")],
            result: stack("stone"),
        });
        let mut buf = ByteBuffer::new();
        assert!(matches!(
            recipe.write(&ctx, &mut buf),
            Err(ProtocolError::Unencodable(_))
        ));
        assert!(!buf.is_readable());
    }

    #[test]
    fn test_shaped_header_layout() {
        let registries = ProtocolRegistries::builtin().unwrap();
        let ctx = CodecContext::default_locale(&registries);
        let mut buf = ByteBuffer::new();
        sticks().write(&ctx, &mut buf).unwrap();
        assert_eq!(buf.read_string().unwrap(), "minecraft:stick");
        assert_eq!(buf.read_string().unwrap(), "crafting_shaped");
        assert_eq!(buf.read_var_int().unwrap(), 1);
        assert_eq!(buf.read_var_int().unwrap(), 2);
    }

    #[test]
    fn test_hostile_shaped_size_rejected() {
        let registries = ProtocolRegistries::builtin().unwrap();
        let ctx = CodecContext::default_locale(&registries);
        let mut buf = ByteBuffer::new();
        buf.write_string("x").unwrap();
        buf.write_string(SHAPED).unwrap();
        buf.write_var_int(16).unwrap();
        buf.write_var_int(16).unwrap();
        assert!(matches!(
            NetworkRecipe::read(&ctx, &mut buf),
            Err(ProtocolError::InvalidMessage(_))
        ));

        let mut buf = ByteBuffer::new();
        buf.write_string("x").unwrap();
        buf.write_string(SHAPED).unwrap();
        buf.write_var_int(-3).unwrap();
        assert!(NetworkRecipe::read(&ctx, &mut buf).is_err());
    }

    #[test]
    fn test_unknown_recipe_type_rejected() {
        let registries = ProtocolRegistries::builtin().unwrap();
        let ctx = CodecContext::default_locale(&registries);
        let mut buf = ByteBuffer::new();
        buf.write_string("x").unwrap();
        buf.write_string("stonecutting").unwrap();
        assert!(matches!(
            NetworkRecipe::read(&ctx, &mut buf),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }
}
