/*!

This is the long-form manual for `canvass_core` and the `canvass` command.

## Input files

The input is a delimited text file with a header line, as exported by most
spreadsheet programs. The delimiter is one of `,` `;` tab or `|`: the one that
appears most often in the header line (outside quotes) is used, with `,` as a fallback.
A first line of the form `sep=;` forces the delimiter and is skipped. A leading
UTF-8 byte order mark is ignored.

Rows may be shorter than the header; missing cells are empty. Rows without a last
name, a first name and an address are dropped and counted as discarded.

## Columns

Headers are matched without regard to case, accents, spaces or punctuation:
`Prénom`, `PRENOM` and `pré-nom` are the same column. Columns that match nothing
are ignored. When two columns map to the same field, the first non-empty one wins.

| field     | accepted headers                                               |
|-----------|----------------------------------------------------------------|
| last name | `Nom`, `Nom de famille`, `last_name`, `Surname`, `Name`        |
| first name| `Prénom`, `Prénoms`, `first_name`, `First`                     |
| precinct  | `Bureau`, `Bureau de vote`, `Code bureau`, `BV`, `Precinct`    |
| address   | `Adresse`, `Addresse`, `Adresse complète`, `Address`           |
| email     | `Email`, `Mail`, `Courriel`                                    |
| phone     | `Téléphone`, `Tel`, `Portable`, `Mobile`, `Phone`              |
| remark    | `Remarque`, `Note`, `Commentaire`, `Remark`, `Comment`         |
| status    | `Statut`, `Status`                                             |
| id        | `Id`                                                           |

### Address parts

Files without an address column may split it: `Numéro`, `Rue`, `Complément`,
`Code postal` and `Ville` (or `number`, `street`, `postal_code`, `zip`, `city`).
The address is then `"<number> <street>, <complement>, <postal code> <city>"`,
leaving out the empty parts.

### Status

The status column accepts the canonical names (`favorable`, `undecided`,
`unfavorable`, `absent`, `not_contacted`) and the usual campaign vocabulary:

* `Favorable`, `fav` ... -> favorable
* `Indécis`, `indecise` ... -> undecided
* `Défavorable`, `Opposé`, `contre` ... -> unfavorable
* `Absent`, `absente` ... -> absent

Anything else, including an empty cell, is `not_contacted`.

### Ids

A non-empty `id` column is kept, which lets an exported file be imported again
without losing the identity of the records. Missing ids, and ids already used
earlier in the same file, are replaced by fresh ones of the form `row_<time>_<counter>`.

## Exports

Every export is a comma-separated file with the header

```text
last_name,first_name,precinct,address,email,phone,remark,status,id
```

and is named after its content and the time of the export:

* `full`: every record, `voters_full_<YYYY-MM-DD_HH-MM>.csv`
* `view`: the filtered and sorted rows, all pages, `voters_view_<...>.csv`
* `favorable`: favorable contacts, `favorable_<...>.csv`
* `favorable-undecided`: favorable and undecided contacts, `favorable_undecided_<...>.csv`

## Sorting and search

Text columns sort without regard to case or accents, and runs of digits compare by
their value (`BV 2` before `BV 10`). Rows that compare equal are ordered by
`"<last name> <first name>"`, then keep their stored order.

The search box matches, case-insensitively, anywhere in the last name, first name,
address, email, phone and remark. The precinct filter is an exact match.

## Configuration file

The `canvass` command reads an optional JSON configuration:

```json
{
  "stateDirectory": ".canvass",
  "exportDirectory": "exports",
  "defaultPageSize": 50
}
```

All the keys are optional. Command line flags take precedence.
*/
